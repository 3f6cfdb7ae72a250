#![forbid(unsafe_code)]

//! Line-oriented intent scripts.
//!
//! Each non-blank line names one intent, for example `nav news`,
//! `key alt+4`, or `login S-100 Ada Lovelace`. Lines starting with `#` are
//! comments. Every intent produces one JSON object on the output; a line
//! that does not parse produces `{"error": ...}` and the script carries on.

use std::io::{self, BufRead, Write};

use portal_core::event::{FocusTarget, KeyEvent, KeyParseError};
use serde_json::{Value, json};

use crate::identity::Identity;
use crate::keymap::KeyDispatch;
use crate::navigation::TopicSelection;
use crate::shell::PortalShell;
use crate::view::ViewId;

/// Events listed by a bare `events` intent.
pub const DEFAULT_EVENT_TAIL: usize = 10;

/// A line that could not be turned into an intent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The first word is not a known intent.
    #[error("unknown command `{0}`")]
    Unknown(String),
    /// A required argument is absent.
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        /// The intent.
        command: &'static str,
        /// What was expected.
        argument: &'static str,
    },
    /// An argument did not parse.
    #[error("`{command}`: invalid {argument} `{value}`")]
    InvalidArgument {
        /// The intent.
        command: &'static str,
        /// What was expected.
        argument: &'static str,
        /// The rejected text.
        value: String,
    },
    /// The key combo did not parse.
    #[error(transparent)]
    Key(#[from] KeyParseError),
}

/// One parsed intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Navigate to a view by name.
    Navigate(String),
    /// Deliver a key press with the given focus.
    Key(KeyEvent, FocusTarget),
    /// Set the active identity.
    Login(Identity),
    /// Log the user out.
    Logout,
    /// Report the admin credential check result.
    AdminLogin(bool),
    /// Drop admin access.
    AdminLogout,
    /// Flip the theme.
    ToggleTheme,
    /// Report the current content ids.
    Content(Vec<u64>),
    /// Drill into a coding topic.
    Select(TopicSelection),
    /// Leave the drilled-into topic.
    Back,
    /// Print the state summary.
    Status,
    /// Print the most recent analytics events.
    Events(usize),
    /// Print the roster.
    Roster,
    /// Clear the session tier.
    EndSession,
}

impl Command {
    /// Parse one script line. Blank lines and comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let command = match head.to_ascii_lowercase().as_str() {
            "nav" | "navigate" => {
                let view = rest.first().ok_or(CommandError::MissingArgument {
                    command: "nav",
                    argument: "a view name",
                })?;
                Self::Navigate((*view).to_string())
            }
            "key" => {
                let combo = rest.first().ok_or(CommandError::MissingArgument {
                    command: "key",
                    argument: "a key combo",
                })?;
                let focus = rest
                    .get(1)
                    .map_or(FocusTarget::Document, |tag| FocusTarget::from_tag(tag));
                Self::Key(KeyEvent::parse_combo(combo)?, focus)
            }
            "login" => {
                let (id, name) = rest.split_first().ok_or(CommandError::MissingArgument {
                    command: "login",
                    argument: "an id and a name",
                })?;
                if name.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "login",
                        argument: "a name",
                    });
                }
                Self::Login(Identity::new(name.join(" "), *id))
            }
            "logout" => Self::Logout,
            "admin-login" => {
                let result = rest.first().copied().unwrap_or("ok");
                let ok = match result.to_ascii_lowercase().as_str() {
                    "ok" | "true" | "pass" => true,
                    "fail" | "false" | "reject" => false,
                    _ => {
                        return Err(CommandError::InvalidArgument {
                            command: "admin-login",
                            argument: "result",
                            value: result.to_string(),
                        });
                    }
                };
                Self::AdminLogin(ok)
            }
            "admin-logout" => Self::AdminLogout,
            "theme" => Self::ToggleTheme,
            "content" => {
                let ids = rest
                    .iter()
                    .flat_map(|w| w.split(','))
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        s.parse::<u64>().map_err(|_| CommandError::InvalidArgument {
                            command: "content",
                            argument: "content id",
                            value: s.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::Content(ids)
            }
            "select" => {
                let (id, name) = rest.split_first().ok_or(CommandError::MissingArgument {
                    command: "select",
                    argument: "a topic id",
                })?;
                let name = if name.is_empty() {
                    (*id).to_string()
                } else {
                    name.join(" ")
                };
                Self::Select(TopicSelection::new(*id, name))
            }
            "back" => Self::Back,
            "status" => Self::Status,
            "events" => {
                let count = match rest.first() {
                    None => DEFAULT_EVENT_TAIL,
                    Some(n) => n.parse().map_err(|_| CommandError::InvalidArgument {
                        command: "events",
                        argument: "count",
                        value: (*n).to_string(),
                    })?,
                };
                Self::Events(count)
            }
            "roster" => Self::Roster,
            "end-session" => Self::EndSession,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Apply the intent and describe the result.
    pub fn run(self, shell: &mut PortalShell) -> Value {
        match self {
            Self::Navigate(name) => {
                let requested = ViewId::parse_lossy(&name);
                let transition = shell.navigate(requested);
                json!({
                    "requested": requested,
                    "view": transition.destination,
                    "redirected": transition.redirected_from(requested),
                })
            }
            Self::Key(event, focus) => match shell.handle_key(&event, focus) {
                KeyDispatch::Navigate(view) => json!({
                    "handled": true,
                    "requested": view,
                    "view": shell.current_view(),
                }),
                KeyDispatch::Ignored => json!({
                    "handled": false,
                    "view": shell.current_view(),
                }),
            },
            Self::Login(identity) => {
                let change = shell.set_identity(identity);
                json!({ "user": shell.identity(), "roster": format!("{change:?}") })
            }
            Self::Logout => {
                shell.logout_user();
                json!({ "user": shell.identity(), "view": shell.current_view() })
            }
            Self::AdminLogin(ok) => json!({ "adminAuthenticated": shell.admin_login(ok) }),
            Self::AdminLogout => {
                shell.admin_logout();
                json!({ "adminAuthenticated": false, "view": shell.current_view() })
            }
            Self::ToggleTheme => json!({ "theme": shell.toggle_theme() }),
            Self::Content(ids) => {
                let fresh = shell.update_content_ids(ids);
                json!({ "hasNewContent": fresh })
            }
            Self::Select(topic) => {
                shell.select_topic(topic);
                json!({ "selection": shell.selection() })
            }
            Self::Back => {
                shell.clear_selection();
                json!({ "selection": Value::Null })
            }
            Self::Status => json!(shell.snapshot()),
            Self::Events(count) => {
                let events = shell.events();
                let skip = events.len().saturating_sub(count);
                json!({ "total": events.len(), "events": &events[skip..] })
            }
            Self::Roster => json!({ "roster": shell.roster() }),
            Self::EndSession => {
                shell.end_session();
                json!({ "sessionEnded": true })
            }
        }
    }
}

/// Counts from one script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptSummary {
    /// Intents applied.
    pub applied: usize,
    /// Lines rejected.
    pub rejected: usize,
}

/// Run every line of `input` against `shell`, writing one JSON line per
/// intent to `output`.
pub fn run_script<R: BufRead, W: Write>(
    shell: &mut PortalShell,
    input: R,
    mut output: W,
) -> io::Result<ScriptSummary> {
    let mut summary = ScriptSummary::default();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let result = match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                summary.applied += 1;
                command.run(shell)
            }
            Err(error) => {
                summary.rejected += 1;
                tracing::warn!(line = index + 1, %error, "rejected script line");
                json!({ "line": index + 1, "error": error.to_string() })
            }
        };
        writeln!(output, "{result}")?;
    }
    output.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::event::{KeyCode, Modifiers};

    #[test]
    fn parses_intents() {
        assert_eq!(
            Command::parse("nav news").unwrap(),
            Some(Command::Navigate("news".into()))
        );
        assert_eq!(
            Command::parse("key alt+4 input").unwrap(),
            Some(Command::Key(
                KeyEvent::new(KeyCode::Char('4')).with_modifiers(Modifiers::ALT),
                FocusTarget::TextInput
            ))
        );
        assert_eq!(
            Command::parse("login S-100 Ada Lovelace").unwrap(),
            Some(Command::Login(Identity::new("Ada Lovelace", "S-100")))
        );
        assert_eq!(
            Command::parse("content 3,9 4").unwrap(),
            Some(Command::Content(vec![3, 9, 4]))
        );
        assert_eq!(
            Command::parse("admin-login fail").unwrap(),
            Some(Command::AdminLogin(false))
        );
        assert_eq!(Command::parse("events").unwrap(), Some(Command::Events(10)));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("# setup").unwrap(), None);
    }

    #[test]
    fn rejects_bad_lines() {
        assert_eq!(
            Command::parse("fly home").unwrap_err(),
            CommandError::Unknown("fly".into())
        );
        assert!(matches!(
            Command::parse("login S-100").unwrap_err(),
            CommandError::MissingArgument { command: "login", .. }
        ));
        assert!(matches!(
            Command::parse("content 1 x").unwrap_err(),
            CommandError::InvalidArgument { command: "content", .. }
        ));
        assert!(matches!(
            Command::parse("key hyper+2").unwrap_err(),
            CommandError::Key(KeyParseError::UnknownModifier(_))
        ));
    }
}
