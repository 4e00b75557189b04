//! Per-tool danger predicates feeding the confirmation prompt.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ToolArguments;

static DANGEROUS_COMMANDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Destructive file operations
        (
            Regex::new(r"\brm\s+(?:-\S+\s+)*(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\b").unwrap(),
            "recursive delete",
        ),
        (Regex::new(r"\b(sudo|doas)\s+rm\b").unwrap(), "privileged rm"),
        // SQL
        (
            Regex::new(r"(?i)\bdrop\s+(table|database|schema|index)\b").unwrap(),
            "SQL DROP",
        ),
        (Regex::new(r"(?i)\bdelete\s+from\b").unwrap(), "SQL DELETE"),
        (Regex::new(r"(?i)\btruncate\s+(table\s+)?\w").unwrap(), "SQL TRUNCATE"),
        // Version control
        (
            Regex::new(r"\bgit\s+push\b.*\s(--force\b|--force-with-lease\b|-f\b)").unwrap(),
            "forced git push",
        ),
        // Disk operations
        (Regex::new(r">\s*/dev/(sd[a-z]|hd[a-z]|nvme\d|disk\d)").unwrap(), "raw device write"),
        (Regex::new(r"\bmkfs(\.[a-z0-9]+)?\b").unwrap(), "mkfs"),
        (Regex::new(r"\bdd\s+.*\bif=").unwrap(), "dd"),
        // Resource exhaustion
        (
            Regex::new(r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:").unwrap(),
            "fork bomb",
        ),
        // Permission changes on system paths
        (
            Regex::new(r"\bchmod\s+(-[a-zA-Z]*R[a-zA-Z]*\s+)?777\s+/(\s|$)").unwrap(),
            "chmod 777 /",
        ),
    ]
});

/// Locations where a write or edit deserves a second look.
const SENSITIVE_PATH_PREFIXES: &[&str] = &["/etc", "/usr", "/bin", "/sbin", "/boot", "/sys", "/dev"];
const SENSITIVE_PATH_FRAGMENTS: &[&str] = &["/.ssh/", ".git/"];

/// Labels of every dangerous pattern matched by the invocation. Empty means
/// nothing dangerous was found.
pub fn assess(tool: &str, arguments: &ToolArguments) -> Vec<&'static str> {
    let str_arg = |key: &str| arguments.get(key).and_then(|v| v.as_str()).unwrap_or("");

    match tool {
        "bash" => dangerous_command_labels(str_arg("command")),
        "write" | "edit" => {
            let path = str_arg("file_path");
            let path = if path.is_empty() { str_arg("path") } else { path };
            if is_sensitive_path(path) {
                vec!["sensitive path"]
            } else {
                Vec::new()
            }
        }
        "delete_dir" => {
            let path = str_arg("dir_path");
            let path = if path.is_empty() { str_arg("path") } else { path };
            let recursive = arguments
                .get("recursive")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let mut labels = Vec::new();
            if recursive {
                labels.push("recursive delete");
            }
            if is_root_or_home(path) {
                labels.push("root or home directory");
            }
            labels
        }
        "move" => {
            let targets = [str_arg("source"), str_arg("destination")];
            if targets.iter().any(|p| is_system_path(p)) {
                vec!["system path"]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

pub fn is_dangerous(tool: &str, arguments: &ToolArguments) -> bool {
    !assess(tool, arguments).is_empty()
}

pub fn dangerous_command_labels(command: &str) -> Vec<&'static str> {
    DANGEROUS_COMMANDS
        .iter()
        .filter(|(regex, _)| regex.is_match(command))
        .map(|(_, label)| *label)
        .collect()
}

fn is_system_path(path: &str) -> bool {
    SENSITIVE_PATH_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
}

fn is_sensitive_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let file_name = path.rsplit('/').next().unwrap_or(path);
    is_system_path(path)
        || path.starts_with("~/.ssh")
        || SENSITIVE_PATH_FRAGMENTS.iter().any(|f| path.contains(f))
        || file_name == ".env"
        || file_name.starts_with(".env.")
}

fn is_root_or_home(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    if path.starts_with('/') && trimmed.is_empty() {
        return true;
    }
    matches!(trimmed, "~" | "$HOME" | "/root" | "/home")
        || (trimmed.starts_with("/home/") && trimmed.matches('/').count() == 2)
}
