use std::path::Path;
use std::process::Command;

use crate::config::model::SshEndpoint;
use crate::util::paths::with_trailing_slash;

/// Mirror flags shared by local and remote copies. `--links` keeps symlinks that
/// stay inside the tree; `--copy-unsafe-links` copies the referent of links that
/// point outside it.
const MIRROR_ARGS: [&str; 5] = ["-rzv", "--links", "--copy-unsafe-links", "--delete", "--progress"];

pub fn local_copy_command(rsync: &str, source: &str, dest: &Path) -> Command {
    let mut cmd = Command::new(rsync);
    cmd.args(MIRROR_ARGS)
        .arg(with_trailing_slash(source))
        .arg(with_trailing_slash(&dest.to_string_lossy()));
    cmd
}

pub fn remote_copy_command(rsync: &str, ssh_program: &str, ssh: &SshEndpoint, source: &str, dest: &Path) -> Command {
    let mut cmd = Command::new(rsync);
    cmd.args(MIRROR_ARGS)
        .arg("-e")
        .arg(format!("{} -p {}", ssh_program, ssh.port))
        .arg(format!(
            "{}@{}:{}",
            ssh.username,
            ssh.host,
            with_trailing_slash(source)
        ))
        .arg(with_trailing_slash(&dest.to_string_lossy()));
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn local_copy_mirrors_with_symlink_safety() {
        let cmd = local_copy_command("rsync", "/data/app", Path::new("/backups/app/2024-01-02__03_04_05"));
        assert_eq!(cmd.get_program(), "rsync");
        assert_eq!(
            args(&cmd),
            vec![
                "-rzv",
                "--links",
                "--copy-unsafe-links",
                "--delete",
                "--progress",
                "/data/app/",
                "/backups/app/2024-01-02__03_04_05/",
            ]
        );
    }

    #[test]
    fn remote_copy_tunnels_over_ssh_port() {
        let ssh = SshEndpoint {
            username: "backup".to_string(),
            host: "web1".to_string(),
            port: 2222,
        };
        let cmd = remote_copy_command("rsync", "ssh", &ssh, "/var/www/", Path::new("/bk/www/s"));
        let args = args(&cmd);
        assert_eq!(&args[5..], ["-e", "ssh -p 2222", "backup@web1:/var/www/", "/bk/www/s/"]);
    }
}
