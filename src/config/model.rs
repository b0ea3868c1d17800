use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub local: LocalSection,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub tools: Tools,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LocalSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub paths: Vec<PathPair>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RemoteSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PathPair {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub ssh: SshEndpoint,
    #[serde(default)]
    pub paths: Vec<PathPair>,
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    pub username: String,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub engine: String,
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database_names: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Program names of the external tools; override when they are not on PATH.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Tools {
    #[serde(default = "default_rsync")]
    pub rsync: String,
    #[serde(default = "default_ssh")]
    pub ssh: String,
    #[serde(default = "default_gzip")]
    pub gzip: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            rsync: default_rsync(),
            ssh: default_ssh(),
            gzip: default_gzip(),
        }
    }
}

/// Validated configuration, read once and only borrowed for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub local: LocalSection,
    pub remote: RemoteSection,
    pub tools: Tools,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_rsync() -> String {
    "rsync".to_string()
}

fn default_ssh() -> String {
    "ssh".to_string()
}

fn default_gzip() -> String {
    "gzip".to_string()
}
