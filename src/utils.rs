use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_SERVER_NAME: &str = "task_schedule";

#[derive(Debug, Default)]
pub struct ParsedArgs {
    pub values: HashMap<String, String>,
    pub flags: HashSet<String>,
}

pub fn parse_args(argv: &[String]) -> ParsedArgs {
    let mut result = ParsedArgs::default();
    let mut i = 0;
    while i < argv.len() {
        let token = &argv[i];
        if !token.starts_with('-') {
            i += 1;
            continue;
        }
        let key = token.trim_start_matches('-');
        if key.is_empty() {
            i += 1;
            continue;
        }
        if let Some((name, inline)) = key.split_once('=') {
            result.values.insert(name.to_string(), inline.to_string());
            i += 1;
            continue;
        }
        if let Some(next_val) = argv.get(i + 1) {
            if !next_val.starts_with('-') {
                result.values.insert(key.to_string(), next_val.to_string());
                i += 2;
                continue;
            }
        }
        result.flags.insert(key.to_string());
        i += 1;
    }
    result
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(path)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub fn get_home_dir() -> PathBuf {
    non_empty_env("HOME")
        .or_else(|| non_empty_env("USERPROFILE"))
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn resolve_state_dir(server_name: &str) -> PathBuf {
    if let Some(root) = non_empty_env("MCP_STATE_ROOT") {
        return PathBuf::from(root.trim()).join(normalize_name(server_name));
    }
    get_home_dir().join(".mcp-servers").join(normalize_name(server_name))
}

pub fn normalize_name(value: &str) -> String {
    let mut out = String::new();
    let mut prev_underscore = false;
    for ch in value.trim().to_lowercase().chars() {
        let valid = ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-';
        if valid {
            out.push(ch);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }
    let trimmed = out.trim_matches('_').to_string();
    if trimmed.is_empty() {
        DEFAULT_SERVER_NAME.to_string()
    } else {
        trimmed
    }
}

pub fn generate_id(prefix: &str) -> String {
    let safe_prefix = normalize_name(prefix);
    format!("{safe_prefix}_{}", Uuid::new_v4())
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_values_and_flags_skipping_bare_words() {
        let args = parse_args(&argv(&["serve", "--db", "/tmp/x.sqlite", "--name=Planner", "-h"]));
        assert!(!args.values.contains_key("serve"));
        assert!(!args.flags.contains("serve"));
        assert_eq!(args.values.get("db").map(String::as_str), Some("/tmp/x.sqlite"));
        assert_eq!(args.values.get("name").map(String::as_str), Some("Planner"));
        assert!(args.flags.contains("h"));
    }

    #[test]
    fn flag_followed_by_flag_stays_a_flag() {
        let args = parse_args(&argv(&["--help", "--db", "a.db"]));
        assert!(args.flags.contains("help"));
        assert_eq!(args.values.get("db").map(String::as_str), Some("a.db"));
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("  My Tasks!! "), "my_tasks");
        assert_eq!(normalize_name("***"), DEFAULT_SERVER_NAME);
    }

    #[test]
    fn ids_carry_prefix() {
        let id = generate_id("task");
        assert!(id.starts_with("task_"));
        assert_eq!(id.len(), "task_".len() + 36);
    }
}
