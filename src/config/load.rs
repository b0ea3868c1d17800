use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::config::model::{Config, DatabaseConfig, PathPair, RuntimeConfig, SshEndpoint};
use crate::error::{ConfigError, FatalError, Result};

pub const CONFIG_FILE: &str = "rbackup.yaml";

pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let mut contents = String::new();
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FatalError::ConfigNotFound(path.to_path_buf()),
        _ => FatalError::Io(e),
    })?;
    file.read_to_string(&mut contents)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<RuntimeConfig> {
    let cfg: Config =
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    parse_runtime(cfg)
}

fn parse_runtime(cfg: Config) -> Result<RuntimeConfig> {
    if cfg.local.enabled {
        for pair in &cfg.local.paths {
            validate_pair("local", pair)?;
        }
    }
    if cfg.remote.enabled {
        for (idx, server) in cfg.remote.servers.iter().enumerate() {
            let label = format!("remote server {}", idx + 1);
            validate_ssh(&label, &server.ssh)?;
            for pair in &server.paths {
                validate_pair(&label, pair)?;
            }
            for db in &server.databases {
                validate_database(&label, db)?;
            }
        }
    }
    if cfg.tools.rsync.trim().is_empty()
        || cfg.tools.ssh.trim().is_empty()
        || cfg.tools.gzip.trim().is_empty()
    {
        return Err(ConfigError::Invalid("tools: program names must not be empty".to_string()).into());
    }
    Ok(RuntimeConfig {
        local: cfg.local,
        remote: cfg.remote,
        tools: cfg.tools,
    })
}

fn validate_pair(label: &str, pair: &PathPair) -> Result<()> {
    if pair.source.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{}: source path is empty", label)).into());
    }
    if pair.target.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{}: target path is empty for source {}",
            label, pair.source
        ))
        .into());
    }
    Ok(())
}

fn validate_ssh(label: &str, ssh: &SshEndpoint) -> Result<()> {
    if ssh.username.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{}: ssh username is required", label)).into());
    }
    if ssh.host.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{}: ssh host is required", label)).into());
    }
    if ssh.port == 0 {
        return Err(ConfigError::Invalid(format!("{}: ssh port must not be 0", label)).into());
    }
    Ok(())
}

fn validate_database(label: &str, db: &DatabaseConfig) -> Result<()> {
    if db.engine.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{}: database engine is required", label)).into());
    }
    if db.host.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{}: database host is required", label)).into());
    }
    if db.user.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{}: database user is required", label)).into());
    }
    for path in &db.paths {
        if path.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{}: database {} has an empty local path",
                label, db.host
            ))
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_config_with_both_sections() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let yaml = r#"
local:
  enabled: true
  paths:
    - source: "/data/app"
      target: "/backups"
remote:
  enabled: true
  servers:
    - ssh:
        username: "backup"
        host: "web1.example.com"
      paths:
        - source: "/var/www"
          target: "/backups/web1"
    - ssh:
        username: "backup"
        host: "db1.example.com"
        port: 2222
      databases:
        - engine: "mysql"
          host: "10.0.0.5"
          user: "dump"
          password: "secret"
          database_names: ["shop", "blog"]
          paths: ["/backups/db"]
"#;
        file.write_all(yaml.as_bytes()).expect("write");
        let cfg = load_config(file.path()).expect("load");
        assert_eq!(cfg.local.paths.len(), 1);
        assert_eq!(cfg.remote.servers.len(), 2);
        assert_eq!(cfg.remote.servers[0].ssh.port, 22);
        assert_eq!(cfg.remote.servers[1].ssh.port, 2222);
        assert_eq!(cfg.remote.servers[1].databases[0].database_names, vec!["shop", "blog"]);
        assert_eq!(cfg.tools.rsync, "rsync");
    }

    #[test]
    fn json_document_is_accepted() {
        let json = r#"{
  "local": { "enabled": true, "paths": [ {"source": "/a", "target": "/b"} ] },
  "remote": { "enabled": false, "servers": [] }
}"#;
        let cfg = parse_config(json).expect("parse");
        assert_eq!(
            cfg.local.paths,
            vec![PathPair { source: "/a".to_string(), target: "/b".to_string() }]
        );
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        match load_config(&path) {
            Err(FatalError::ConfigNotFound(p)) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_target_is_rejected() {
        let yaml = r#"
local:
  enabled: true
  paths:
    - source: "/data"
      target: ""
"#;
        let err = parse_config(yaml).expect_err("invalid");
        assert!(err.to_string().contains("target path is empty"));
    }

    #[test]
    fn disabled_sections_are_not_validated() {
        let yaml = r#"
local:
  enabled: false
  paths:
    - source: ""
      target: ""
"#;
        assert!(parse_config(yaml).is_ok());
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = parse_config("local: [unclosed").expect_err("parse");
        assert!(matches!(err, FatalError::Config(ConfigError::Parse(_))));
    }
}
