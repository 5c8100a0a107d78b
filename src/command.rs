//! Host commands as argument vectors, and the outcome of running one.
//!
//! Commands never pass through a shell. When a command has to travel as a
//! single string (logs, the legacy relay request form) it is rendered with
//! [`quote_arg`] and read back with [`split_command_line`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A command to run on the host: program, arguments, optional working
/// directory and optional execution timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl HostCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.argv().iter().map(|a| quote_arg(a)).collect();
        write!(f, "{}", rendered.join(" "))
    }
}

/// Raw outcome of one relay round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Process exit status; `-1` when the process was killed by a signal.
    #[serde(default)]
    pub exit_status: i32,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Set when stdout or stderr hit the relay's output cap.
    #[serde(default)]
    pub truncated: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    pub fn has_stderr(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

/// Split a command line into words using POSIX-like quoting.
///
/// Single quotes preserve everything literally, double quotes allow `\"`,
/// `\\`, `\$` and `` \` `` escapes, and an unquoted backslash escapes the next
/// character. Operators such as `&&`, `|` or `;` are plain words.
pub fn split_command_line(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\' | '$' | '`')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => return Err("unterminated double quote".to_string()),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '\\' => match chars.next() {
                Some(ch) => {
                    in_word = true;
                    current.push(ch);
                }
                None => return Err("trailing backslash".to_string()),
            },
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Quote one argument so [`split_command_line`] reads it back unchanged.
pub fn quote_arg(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            split_command_line("  docker   ps -a ").unwrap(),
            vec!["docker", "ps", "-a"]
        );
    }

    #[test]
    fn test_split_quoted_format_argument() {
        let argv = split_command_line(r#"docker ps --format "{{json .}}""#).unwrap();
        assert_eq!(argv, vec!["docker", "ps", "--format", "{{json .}}"]);
    }

    #[test]
    fn test_split_keeps_shell_operators_literal() {
        let argv = split_command_line("echo a && rm -rf /").unwrap();
        assert_eq!(argv, vec!["echo", "a", "&&", "rm", "-rf", "/"]);
    }

    #[test]
    fn test_split_empty_quoted_argument() {
        assert_eq!(split_command_line("echo ''").unwrap(), vec!["echo", ""]);
    }

    #[test]
    fn test_split_rejects_unterminated_quote() {
        assert!(split_command_line("echo 'oops").is_err());
        assert!(split_command_line("echo \"oops").is_err());
        assert!(split_command_line("echo oops\\").is_err());
    }

    #[test]
    fn test_display_round_trips_through_split() {
        let cmd = HostCommand::new("docker")
            .args(["container", "inspect", "--format"])
            .arg("{{json .NetworkSettings.Networks}}")
            .arg("it's");
        let rendered = cmd.to_string();
        assert_eq!(split_command_line(&rendered).unwrap(), cmd.argv());
    }

    #[test]
    fn test_command_result_defaults_missing_fields() {
        let result: CommandResult = serde_json::from_str(r#"{"stdout":"ok"}"#).unwrap();
        assert_eq!(result.exit_status, 0);
        assert!(result.success());
        assert!(!result.has_stderr());
    }
}
