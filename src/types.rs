use std::fmt;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    pub verbose: bool,
    pub show_progress: bool,
}

/// Database engines the dump pipeline knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    MySql,
}

impl DatabaseEngine {
    /// Accepts the mysql family (`mysql`, `mariadb`) case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(DatabaseEngine::MySql),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::MySql => "mysql",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
