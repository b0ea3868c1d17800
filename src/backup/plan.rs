use std::fmt;
use std::path::PathBuf;

use crate::config::model::{DatabaseConfig, RuntimeConfig, SshEndpoint};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    LocalCopy {
        source: String,
        target: PathBuf,
    },
    RemoteCopy {
        ssh: SshEndpoint,
        source: String,
        target: PathBuf,
    },
    RemoteDatabaseDump {
        ssh: SshEndpoint,
        database: DatabaseConfig,
        db_name: String,
        target: PathBuf,
    },
}

/// One unit of backup work, consumed exactly once by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
}

impl Task {
    pub fn local_copy(source: &str, target: &str) -> Self {
        Self {
            id: format!("local:{} -> {}", source, target),
            kind: TaskKind::LocalCopy {
                source: source.to_string(),
                target: PathBuf::from(target),
            },
        }
    }

    pub fn remote_copy(ssh: &SshEndpoint, source: &str, target: &str) -> Self {
        Self {
            id: format!(
                "remote:{}@{}:{}:{} -> {}",
                ssh.username, ssh.host, ssh.port, source, target
            ),
            kind: TaskKind::RemoteCopy {
                ssh: ssh.clone(),
                source: source.to_string(),
                target: PathBuf::from(target),
            },
        }
    }

    pub fn database_dump(ssh: &SshEndpoint, database: &DatabaseConfig, db_name: &str, target: &str) -> Self {
        Self {
            id: format!(
                "{}:{}@{}/{} via {}@{} -> {}",
                database.engine, database.user, database.host, db_name, ssh.username, ssh.host, target
            ),
            kind: TaskKind::RemoteDatabaseDump {
                ssh: ssh.clone(),
                database: database.clone(),
                db_name: db_name.to_string(),
                target: PathBuf::from(target),
            },
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    pub total: usize,
}

fn database_task_count(db: &DatabaseConfig) -> usize {
    db.database_names.len() * db.paths.len()
}

/// Number of tasks the configuration yields, clamped to at least 1 so the
/// progress denominator is never zero.
pub fn count_tasks(cfg: &RuntimeConfig) -> usize {
    let mut total = 0;
    if cfg.local.enabled {
        total += cfg.local.paths.len();
    }
    if cfg.remote.enabled {
        for server in &cfg.remote.servers {
            total += server.paths.len();
            total += server.databases.iter().map(database_task_count).sum::<usize>();
        }
    }
    total.max(1)
}

/// Local tasks first, then each server in order: its folders, then every
/// database spec, database name and local path, innermost loop last.
pub fn build_plan(cfg: &RuntimeConfig) -> TaskPlan {
    let total = count_tasks(cfg);
    let mut tasks = Vec::new();
    if cfg.local.enabled {
        for pair in &cfg.local.paths {
            tasks.push(Task::local_copy(&pair.source, &pair.target));
        }
    }
    if cfg.remote.enabled {
        for server in &cfg.remote.servers {
            for pair in &server.paths {
                tasks.push(Task::remote_copy(&server.ssh, &pair.source, &pair.target));
            }
            for database in &server.databases {
                for db_name in &database.database_names {
                    for path in &database.paths {
                        tasks.push(Task::database_dump(&server.ssh, database, db_name, path));
                    }
                }
            }
        }
    }
    TaskPlan { tasks, total }
}

pub fn print_plan(plan: &TaskPlan) {
    println!("planned tasks: {}", plan.tasks.len());
    for (idx, task) in plan.tasks.iter().enumerate() {
        println!("  {:>3}. {}", idx + 1, task);
    }
    println!("progress total: {}", plan.total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load::parse_config;

    const MIXED: &str = r#"
local:
  enabled: true
  paths:
    - { source: "/data/a", target: "/backups/local" }
    - { source: "/data/b", target: "/backups/local" }
remote:
  enabled: true
  servers:
    - ssh: { username: "u1", host: "h1" }
      paths:
        - { source: "/srv/x", target: "/backups/h1" }
    - ssh: { username: "u2", host: "h2", port: 2200 }
      databases:
        - engine: "mysql"
          host: "db-a"
          user: "root"
          password: "pw"
          database_names: ["one", "two"]
          paths: ["/backups/p1", "/backups/p2"]
        - engine: "postgres"
          host: "db-b"
          user: "pg"
          password: "pw"
          database_names: ["three"]
          paths: ["/backups/p3"]
"#;

    fn ids(plan: &TaskPlan) -> Vec<String> {
        plan.tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn total_counts_pairs_and_database_products() {
        let cfg = parse_config(MIXED).expect("config");
        // 2 local + 1 remote folder + (2 x 2) + (1 x 1) dumps
        assert_eq!(count_tasks(&cfg), 8);
        let plan = build_plan(&cfg);
        assert_eq!(plan.total, 8);
        assert_eq!(plan.tasks.len(), 8);
    }

    #[test]
    fn enumeration_order_follows_configuration() {
        let cfg = parse_config(MIXED).expect("config");
        let plan = build_plan(&cfg);
        assert_eq!(
            ids(&plan),
            vec![
                "local:/data/a -> /backups/local",
                "local:/data/b -> /backups/local",
                "remote:u1@h1:22:/srv/x -> /backups/h1",
                "mysql:root@db-a/one via u2@h2 -> /backups/p1",
                "mysql:root@db-a/one via u2@h2 -> /backups/p2",
                "mysql:root@db-a/two via u2@h2 -> /backups/p1",
                "mysql:root@db-a/two via u2@h2 -> /backups/p2",
                "postgres:pg@db-b/three via u2@h2 -> /backups/p3",
            ]
        );
    }

    #[test]
    fn disabled_sections_are_skipped() {
        let mut cfg = parse_config(MIXED).expect("config");
        cfg.local.enabled = false;
        assert_eq!(count_tasks(&cfg), 6);
        assert!(build_plan(&cfg)
            .tasks
            .iter()
            .all(|t| !matches!(t.kind, TaskKind::LocalCopy { .. })));

        cfg.remote.enabled = false;
        let plan = build_plan(&cfg);
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.total, 1);
    }

    #[test]
    fn empty_configuration_clamps_total_to_one() {
        let cfg = parse_config("local: { enabled: true, paths: [] }").expect("config");
        assert_eq!(count_tasks(&cfg), 1);
        assert!(build_plan(&cfg).tasks.is_empty());
    }

    #[test]
    fn database_without_paths_yields_no_tasks() {
        let yaml = r#"
remote:
  enabled: true
  servers:
    - ssh: { username: "u", host: "h" }
      databases:
        - { engine: "mysql", host: "db", user: "r", database_names: ["a", "b"], paths: [] }
"#;
        let cfg = parse_config(yaml).expect("config");
        assert_eq!(count_tasks(&cfg), 1);
        assert!(build_plan(&cfg).tasks.is_empty());
    }
}
