use std::path::PathBuf;

use crate::utils::{normalize_name, resolve_state_dir, ParsedArgs, DEFAULT_SERVER_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub server_name: String,
    pub state_dir: PathBuf,
    pub db_path: PathBuf,
    pub show_help: bool,
}

impl ServerConfig {
    pub fn from_args(args: &ParsedArgs) -> Self {
        let server_name = normalize_name(
            args.values
                .get("name")
                .map(String::as_str)
                .unwrap_or(DEFAULT_SERVER_NAME),
        );
        let state_dir = resolve_state_dir(&server_name);
        let db_path = args
            .values
            .get("db")
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| state_dir.join(format!("{server_name}.db.sqlite")));
        Self {
            server_name,
            state_dir,
            db_path,
            show_help: args.flags.contains("help") || args.flags.contains("h"),
        }
    }

    /// Directory that must exist before the database can be opened.
    pub fn db_dir(&self) -> Option<PathBuf> {
        self.db_path.parent().map(PathBuf::from)
    }
}

pub fn help_text() -> &'static str {
    "Usage: task-schedule-mcp-server-rs [--name <id>] [--db <path>]\n\n\
Options:\n  \
--name <id>   MCP server name (default task_schedule)\n  \
--db <path>   SQLite file path (default <state dir>/<name>.db.sqlite)\n  \
--help        Show help\n\n\
Environment:\n  \
MCP_STATE_ROOT  Root for per-server state directories (default ~/.mcp-servers)\n  \
RUST_LOG        Log filter for stderr output (default info)"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_args;

    #[test]
    fn explicit_db_path_wins() {
        let argv: Vec<String> = ["--name", "Planner", "--db", "/tmp/planner.sqlite"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = ServerConfig::from_args(&parse_args(&argv));
        assert_eq!(config.server_name, "planner");
        assert_eq!(config.db_path, PathBuf::from("/tmp/planner.sqlite"));
        assert_eq!(config.db_dir(), Some(PathBuf::from("/tmp")));
        assert!(!config.show_help);
    }

    #[test]
    fn default_db_lives_in_state_dir() {
        let config = ServerConfig::from_args(&parse_args(&["-h".to_string()]));
        assert_eq!(config.server_name, DEFAULT_SERVER_NAME);
        assert!(config.db_path.starts_with(&config.state_dir));
        assert!(config.db_path.ends_with("task_schedule.db.sqlite"));
        assert!(config.show_help);
    }
}
