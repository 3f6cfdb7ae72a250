#![forbid(unsafe_code)]

//! Command-line and environment configuration for the `portal-shell` binary.
//!
//! Every flag has an environment fallback under the `PORTAL_` prefix.
//! Explicit flags win over the environment.

use std::path::{Path, PathBuf};

use clap::Parser;
use portal_core::logging::{DEFAULT_FILTER, LogFormat};

/// File holding the durable tier, inside the state directory.
pub const DURABLE_FILE: &str = "durable.json";
/// Directory holding one file per session, inside the state directory.
pub const SESSIONS_DIR: &str = "sessions";
/// Session id used when none is configured.
pub const DEFAULT_SESSION: &str = "default";

/// Drive the portal's client-state core from a script of intents.
#[derive(Debug, Clone, Parser)]
#[command(name = "portal-shell", version)]
#[command(about = "Drive the portal client-state core from a script of intents", long_about = None)]
pub struct ShellConfig {
    /// Directory for persisted state.
    #[arg(long, env = "PORTAL_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Session identifier; each session gets its own session-tier file.
    #[arg(long, env = "PORTAL_SESSION", default_value = DEFAULT_SESSION)]
    pub session: String,

    /// Read intents from this file instead of stdin.
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Log output format: `text` or `json`.
    #[arg(long, env = "PORTAL_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log filter directive, e.g. `portal_shell=debug`.
    #[arg(long, env = "PORTAL_LOG", default_value = DEFAULT_FILTER)]
    pub log: String,
}

impl ShellConfig {
    /// Parsed log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_name(&self.log_format)
    }

    /// The state directory, falling back to the platform default.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            default_state_dir(
                std::env::var_os("XDG_STATE_HOME").map(PathBuf::from),
                std::env::var_os("HOME").map(PathBuf::from),
            )
        })
    }

    /// Path of the durable-tier file.
    #[must_use]
    pub fn durable_path(&self) -> PathBuf {
        self.state_dir().join(DURABLE_FILE)
    }

    /// Path of this session's session-tier file.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        session_path(&self.state_dir(), &self.session)
    }
}

/// `$XDG_STATE_HOME/portal`, else `~/.local/state/portal`, else `.`.
#[must_use]
pub fn default_state_dir(xdg_state_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(xdg) = xdg_state_home.filter(|p| p.is_absolute()) {
        return xdg.join("portal");
    }
    if let Some(home) = home.filter(|p| !p.as_os_str().is_empty()) {
        return home.join(".local").join("state").join("portal");
    }
    PathBuf::from(".")
}

/// Session file for `session` under `state_dir`. Characters outside
/// `[A-Za-z0-9_-]` are replaced so the id cannot escape the directory.
#[must_use]
pub fn session_path(state_dir: &Path, session: &str) -> PathBuf {
    let mut name: String = session
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        name.push_str(DEFAULT_SESSION);
    }
    state_dir.join(SESSIONS_DIR).join(format!("{name}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn declared_default(id: &str) -> Option<String> {
        let cmd = ShellConfig::command();
        let arg = cmd.get_arguments().find(|a| a.get_id() == id)?;
        arg.get_default_values()
            .first()
            .and_then(|v| v.to_str())
            .map(str::to_string)
    }

    #[test]
    fn declared_defaults() {
        // Read from the declaration so PORTAL_* variables in the test
        // environment cannot mask them.
        assert_eq!(declared_default("session").as_deref(), Some(DEFAULT_SESSION));
        assert_eq!(declared_default("log_format").as_deref(), Some("text"));
        assert_eq!(declared_default("log").as_deref(), Some(DEFAULT_FILTER));
        assert_eq!(declared_default("state_dir"), None);
    }

    #[test]
    fn paths_derive_from_state_dir() {
        let cfg = ShellConfig::try_parse_from([
            "portal-shell",
            "--state-dir",
            "/tmp/p",
            "--session",
            "default",
            "--log-format",
            "text",
        ])
        .unwrap();
        assert_eq!(cfg.log_format(), LogFormat::Text);
        assert_eq!(cfg.durable_path(), PathBuf::from("/tmp/p/durable.json"));
        assert_eq!(
            cfg.session_path(),
            PathBuf::from("/tmp/p/sessions/default.json")
        );
    }

    #[test]
    fn flags_override() {
        let cfg = ShellConfig::try_parse_from([
            "portal-shell",
            "--session",
            "tab-2",
            "--log-format",
            "JSON",
            "--script",
            "intents.txt",
        ])
        .unwrap();
        assert_eq!(cfg.session, "tab-2");
        assert_eq!(cfg.log_format(), LogFormat::Json);
        assert_eq!(cfg.script, Some(PathBuf::from("intents.txt")));
    }

    #[test]
    fn state_dir_fallbacks() {
        assert_eq!(
            default_state_dir(Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/xdg/portal")
        );
        assert_eq!(
            default_state_dir(Some("relative".into()), Some("/home/u".into())),
            PathBuf::from("/home/u/.local/state/portal")
        );
        assert_eq!(default_state_dir(None, None), PathBuf::from("."));
    }

    #[test]
    fn session_ids_are_sanitized() {
        let dir = Path::new("/s");
        assert_eq!(
            session_path(dir, "../etc/passwd"),
            PathBuf::from("/s/sessions/___etc_passwd.json")
        );
        assert_eq!(session_path(dir, ""), PathBuf::from("/s/sessions/default.json"));
    }
}
