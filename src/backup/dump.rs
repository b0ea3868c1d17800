use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::model::{DatabaseConfig, SshEndpoint};
use crate::types::DatabaseEngine;
use crate::util::command::shell_quote;

pub fn dump_file_name(db_name: &str) -> String {
    format!("{}.sql", db_name)
}

pub fn compressed_path(dump: &Path) -> PathBuf {
    let mut name = dump.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Runs the engine's dump tool on the ssh host; it connects to the database
/// endpoint, which need not be the ssh host itself. ssh joins the remote words
/// into one string for the remote shell, so each word is quoted there.
pub fn remote_dump_command(
    ssh_program: &str,
    ssh: &SshEndpoint,
    engine: DatabaseEngine,
    database: &DatabaseConfig,
    db_name: &str,
) -> Command {
    let remote: Vec<String> = match engine {
        DatabaseEngine::MySql => vec![
            "mysqldump".to_string(),
            "--single-transaction".to_string(),
            "--skip-lock-tables".to_string(),
            "--quick".to_string(),
            "-h".to_string(),
            database.host.clone(),
            "-u".to_string(),
            database.user.clone(),
            format!("--password={}", database.password),
            db_name.to_string(),
        ],
    };
    let mut cmd = Command::new(ssh_program);
    cmd.arg("-p")
        .arg(ssh.port.to_string())
        .arg(format!("{}@{}", ssh.username, ssh.host))
        .arg("--");
    for word in &remote {
        cmd.arg(shell_quote(word));
    }
    cmd
}

pub fn compress_command(gzip: &str, dump: &Path) -> Command {
    let mut cmd = Command::new(gzip);
    cmd.arg("-f").arg(dump);
    cmd
}
