//! Compiled workflow tree

use action_primitives::WaitUntil;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// Default `screenshot` directory template.
pub const DEFAULT_SCREENSHOT_PATH: &str = "logs/${JobId}/";

/// One node of a compiled workflow. Pure data; shared read-only between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Sequence {
        children: Vec<Command>,
    },
    IfElse {
        condition: Box<Command>,
        then: Box<Command>,
        otherwise: Option<Box<Command>>,
    },
    Navigate {
        url: String,
        wait_until: WaitUntil,
    },
    Click {
        selector: String,
        /// Click deadline; driver default when absent
        timeout: Option<Duration>,
        post_click: PostClickWait,
    },
    ElementExists {
        selector: String,
        /// Fixed settle delay before counting
        timeout: Option<Duration>,
    },
    FillForm {
        form_id: String,
    },
    Exit {
        success: bool,
        message: Option<String>,
    },
    Screenshot {
        path_template: String,
    },
}

/// The single wait applied after a click, chosen by priority at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PostClickWait {
    /// Click, then sleep
    Delay { duration: Duration },
    /// Click while waiting for another selector
    Selector { selector: String },
    /// Click while waiting for the network to settle
    NetworkIdle,
    #[default]
    None,
}

/// Result of executing one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminated { success: bool, message: Option<String> },
}

impl Flow {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Flow::Terminated { .. })
    }
}

impl Command {
    /// DSL type name of this node.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Sequence { .. } => "sequence",
            Command::IfElse { .. } => "ifelse",
            Command::Navigate { .. } => "navigate",
            Command::Click { .. } => "click",
            Command::ElementExists { .. } => "exists",
            Command::FillForm { .. } => "fillform",
            Command::Exit { .. } => "exit",
            Command::Screenshot { .. } => "screenshot",
        }
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + match self {
            Command::Sequence { children } => children.iter().map(Command::node_count).sum(),
            Command::IfElse {
                condition,
                then,
                otherwise,
            } => {
                condition.node_count()
                    + then.node_count()
                    + otherwise.as_ref().map_or(0, |node| node.node_count())
            }
            _ => 0,
        }
    }

    /// Indented one-line-per-node rendering.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0, "");
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize, label: &str) {
        let indent = "  ".repeat(depth);
        let detail = match self {
            Command::Sequence { children } => format!("{} step(s)", children.len()),
            Command::IfElse { otherwise, .. } => {
                if otherwise.is_some() {
                    "with else".to_string()
                } else {
                    "without else".to_string()
                }
            }
            Command::Navigate { url, wait_until } => format!("{url} (until {wait_until})"),
            Command::Click {
                selector,
                post_click,
                ..
            } => match post_click {
                PostClickWait::Delay { duration } => {
                    format!("{selector} then sleep {}s", duration.as_secs())
                }
                PostClickWait::Selector { selector: next } => {
                    format!("{selector} awaiting {next}")
                }
                PostClickWait::NetworkIdle => format!("{selector} awaiting network idle"),
                PostClickWait::None => selector.clone(),
            },
            Command::ElementExists { selector, .. } => selector.clone(),
            Command::FillForm { form_id } => form_id.clone(),
            Command::Exit { success, message } => match message {
                Some(message) => format!("success={success} \"{message}\""),
                None => format!("success={success}"),
            },
            Command::Screenshot { path_template } => path_template.clone(),
        };
        let _ = writeln!(out, "{indent}{label}{} {detail}", self.kind());

        match self {
            Command::Sequence { children } => {
                for child in children {
                    child.write_outline(out, depth + 1, "");
                }
            }
            Command::IfElse {
                condition,
                then,
                otherwise,
            } => {
                condition.write_outline(out, depth + 1, "if: ");
                then.write_outline(out, depth + 1, "then: ");
                if let Some(otherwise) = otherwise {
                    otherwise.write_outline(out, depth + 1, "else: ");
                }
            }
            _ => {}
        }
    }
}
