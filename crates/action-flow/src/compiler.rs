//! JSON workflow DSL compiler
//!
//! Node shapes:
//!
//! ```json
//! {"type": "sequence", "commands": [ ... ]}
//! {"type": "ifelse", "condition": {..}, "then": {..}, "else": {..}}
//! {"type": "navigate", "url": "${JobUrl}", "waitUntil": "networkidle"}
//! {"type": "click", "selector": "#apply", "customTimeout": 5000, "waitForSelector": "#form"}
//! {"type": "exists", "selector": "#cookie-banner", "timeout": 1500}
//! {"type": "fillform", "formId": "pracuj-apply"}
//! {"type": "exit", "success": true, "message": "applied"}
//! {"type": "screenshot", "path": "logs/${JobId}/"}
//! ```
//!
//! Type names are case-insensitive. Compilation is pure: the same text always yields the
//! same tree, and any error aborts the whole document.

use action_primitives::WaitUntil;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::command::{Command, PostClickWait, DEFAULT_SCREENSHOT_PATH};
use crate::errors::FlowError;

type Node = Map<String, Value>;

/// Compile a workflow document into a command tree.
pub fn compile(json_text: &str) -> Result<Command, FlowError> {
    let root: Value = serde_json::from_str(json_text)?;
    compile_node(&root, "$")
}

fn malformed(path: &str, reason: impl std::fmt::Display) -> FlowError {
    FlowError::MalformedWorkflow(format!("{path}: {reason}"))
}

fn compile_node(value: &Value, path: &str) -> Result<Command, FlowError> {
    let node = value
        .as_object()
        .ok_or_else(|| malformed(path, "node must be a JSON object"))?;

    let kind = match node.get("type") {
        Some(Value::String(kind)) => kind.to_ascii_lowercase(),
        Some(_) => return Err(malformed(path, "'type' must be a string")),
        None => return Err(malformed(path, "node is missing 'type'")),
    };

    match kind.as_str() {
        "sequence" => compile_sequence(node, path),
        "ifelse" => compile_if_else(node, path),
        "navigate" => Ok(Command::Navigate {
            url: required_str(node, "url", path)?,
            wait_until: match optional_str(node, "waitUntil", path)? {
                Some(raw) => WaitUntil::parse_lenient(&raw),
                None => WaitUntil::Load,
            },
        }),
        "click" => compile_click(node, path),
        "exists" => Ok(Command::ElementExists {
            selector: required_str(node, "selector", path)?,
            timeout: optional_millis(node, "timeout", path)?,
        }),
        "fillform" => Ok(Command::FillForm {
            form_id: required_str(node, "formId", path)?,
        }),
        "exit" => Ok(Command::Exit {
            success: match node.get("success") {
                Some(Value::Bool(flag)) => *flag,
                Some(_) => return Err(malformed(path, "'success' must be a boolean")),
                None => return Err(malformed(path, "exit is missing 'success'")),
            },
            message: optional_str(node, "message", path)?.filter(|m| !m.is_empty()),
        }),
        "screenshot" => Ok(Command::Screenshot {
            path_template: match node.get("path") {
                None | Some(Value::Null) => DEFAULT_SCREENSHOT_PATH.to_string(),
                Some(_) => required_str(node, "path", path)?,
            },
        }),
        other => Err(malformed(path, format!("unknown command type '{other}'"))),
    }
}

fn compile_sequence(node: &Node, path: &str) -> Result<Command, FlowError> {
    let children = match node.get("commands") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| compile_node(item, &format!("{path}.commands[{index}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(malformed(path, "'commands' must be an array")),
    };
    Ok(Command::Sequence { children })
}

fn compile_if_else(node: &Node, path: &str) -> Result<Command, FlowError> {
    let condition = match node.get("condition") {
        None | Some(Value::Null) => return Err(malformed(path, "ifelse is missing 'condition'")),
        Some(value) => compile_node(value, &format!("{path}.condition"))?,
    };
    let then = match node.get("then") {
        None | Some(Value::Null) => return Err(malformed(path, "ifelse is missing 'then'")),
        Some(value) => compile_node(value, &format!("{path}.then"))?,
    };
    let otherwise = match node.get("else") {
        None | Some(Value::Null) => None,
        Some(value) => Some(Box::new(compile_node(value, &format!("{path}.else"))?)),
    };
    Ok(Command::IfElse {
        condition: Box::new(condition),
        then: Box::new(then),
        otherwise,
    })
}

fn compile_click(node: &Node, path: &str) -> Result<Command, FlowError> {
    let selector = required_str(node, "selector", path)?;
    let timeout = optional_millis(node, "customTimeout", path)?;

    let delay = optional_u64(node, "waitForTimeoutSeconds", path)?;
    let next_selector = optional_str(node, "waitForSelector", path)?.filter(|s| !s.is_empty());
    let network_idle = match node.get("waitForNetworkIdle") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(malformed(path, "'waitForNetworkIdle' must be a boolean")),
    };

    let post_click = if let Some(secs) = delay {
        PostClickWait::Delay {
            duration: Duration::from_secs(secs),
        }
    } else if let Some(selector) = next_selector {
        PostClickWait::Selector { selector }
    } else if network_idle {
        PostClickWait::NetworkIdle
    } else {
        PostClickWait::None
    };

    Ok(Command::Click {
        selector,
        timeout,
        post_click,
    })
}

fn required_str(node: &Node, field: &str, path: &str) -> Result<String, FlowError> {
    match optional_str(node, field, path)? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(malformed(path, format!("'{field}' must not be empty"))),
        None => Err(malformed(path, format!("missing required field '{field}'"))),
    }
}

fn optional_str(node: &Node, field: &str, path: &str) -> Result<Option<String>, FlowError> {
    match node.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(malformed(path, format!("'{field}' must be a string"))),
    }
}

/// Non-negative integer given as a JSON number or a numeric string.
fn optional_u64(node: &Node, field: &str, path: &str) -> Result<Option<u64>, FlowError> {
    match node.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(Some)
            .ok_or_else(|| malformed(path, format!("'{field}' must be a non-negative integer"))),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| malformed(path, format!("'{field}' must be a non-negative integer"))),
        Some(_) => Err(malformed(path, format!("'{field}' must be an integer"))),
    }
}

fn optional_millis(node: &Node, field: &str, path: &str) -> Result<Option<Duration>, FlowError> {
    Ok(optional_u64(node, field, path)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPLY: &str = r##"{
        "type": "Sequence",
        "commands": [
            {"type": "navigate", "url": "${JobUrl}", "waitUntil": "networkidle"},
            {"type": "click", "selector": "#accept", "waitForTimeoutSeconds": 2, "waitForSelector": "#x"},
            {"type": "click", "selector": "#apply", "customTimeout": "5000", "waitForSelector": "#form"},
            {"type": "ifelse",
             "condition": {"type": "exists", "selector": "#form", "timeout": 1500},
             "then": {"type": "fillform", "formId": "pracuj-apply"},
             "else": {"type": "exit", "success": false, "message": "no form"}},
            {"type": "screenshot"},
            {"type": "exit", "success": true, "message": ""}
        ]
    }"##;

    #[test]
    fn compiles_full_document() {
        let Command::Sequence { children } = compile(APPLY).unwrap() else {
            panic!("root must be a sequence");
        };
        assert_eq!(children.len(), 6);
        assert_eq!(
            children[0],
            Command::Navigate {
                url: "${JobUrl}".into(),
                wait_until: WaitUntil::NetworkIdle
            }
        );
        assert_eq!(
            children[1],
            Command::Click {
                selector: "#accept".into(),
                timeout: None,
                post_click: PostClickWait::Delay {
                    duration: Duration::from_secs(2)
                },
            }
        );
        assert_eq!(
            children[2],
            Command::Click {
                selector: "#apply".into(),
                timeout: Some(Duration::from_millis(5000)),
                post_click: PostClickWait::Selector {
                    selector: "#form".into()
                },
            }
        );
        assert_eq!(
            children[4],
            Command::Screenshot {
                path_template: DEFAULT_SCREENSHOT_PATH.into()
            }
        );
        assert_eq!(
            children[5],
            Command::Exit {
                success: true,
                message: None
            }
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        assert_eq!(compile(APPLY).unwrap(), compile(APPLY).unwrap());
    }

    #[test]
    fn unknown_wait_until_falls_back_to_load() {
        let cmd = compile(r#"{"type":"navigate","url":"https://x.test","waitUntil":"commit"}"#)
            .unwrap();
        assert_eq!(
            cmd,
            Command::Navigate {
                url: "https://x.test".into(),
                wait_until: WaitUntil::Load
            }
        );
    }

    #[test]
    fn missing_commands_is_an_empty_sequence() {
        assert_eq!(
            compile(r#"{"type":"sequence"}"#).unwrap(),
            Command::Sequence { children: vec![] }
        );
    }

    #[test]
    fn network_idle_is_lowest_priority_wait() {
        let cmd = compile(r##"{"type":"click","selector":"#a","waitForNetworkIdle":true}"##).unwrap();
        assert!(matches!(
            cmd,
            Command::Click {
                post_click: PostClickWait::NetworkIdle,
                ..
            }
        ));
    }

    #[test]
    fn rejects_malformed_documents() {
        let cases = [
            "not json",
            "[]",
            r##"{"selector":"#a"}"##,
            r##"{"type":"hover","selector":"#a"}"##,
            r#"{"type":"click"}"#,
            r#"{"type":"click","selector":""}"#,
            r#"{"type":"navigate"}"#,
            r#"{"type":"fillform"}"#,
            r#"{"type":"exit"}"#,
            r#"{"type":"exit","success":"yes"}"#,
            r#"{"type":"ifelse","then":{"type":"exit","success":true}}"#,
            r##"{"type":"ifelse","condition":{"type":"exists","selector":"#a"}}"##,
            r##"{"type":"exists","selector":"#a","timeout":-5}"##,
            r#"{"type":"screenshot","path":""}"#,
            r#"{"type":"screenshot","path":"  "}"#,
            r#"{"type":"sequence","commands":{"type":"exit","success":true}}"#,
            r#"{"type":"sequence","commands":[{"type":"exit","success":true},{"type":"bogus"}]}"#,
        ];
        for case in cases {
            let err = compile(case).unwrap_err();
            assert!(
                matches!(err, FlowError::MalformedWorkflow(_)),
                "{case} produced {err:?}"
            );
        }
    }

    #[test]
    fn errors_name_the_failing_node() {
        let err = compile(r#"{"type":"sequence","commands":[{"type":"click"}]}"#).unwrap_err();
        assert!(err.to_string().contains("$.commands[0]"), "{err}");
    }
}
