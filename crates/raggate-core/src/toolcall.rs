//! Tool-call detection in model replies
//!
//! The tool-decision prompt teaches the model to request a tool with an
//! inline block: `<APIs>[{"name": "web_search", "parameters": {...}}]</APIs>`.
//! This module finds that block and classifies the reply three ways, so the
//! caller can tell "no tool wanted" apart from "tool wanted but the block is
//! garbage".

use serde_json::{Map, Value};

const OPEN_TAG: &str = "<APIs>";
const CLOSE_TAG: &str = "</APIs>";

/// Name used when the block omits one; web search is the only tool taught
pub const DEFAULT_TOOL_NAME: &str = "web_search";

/// A parsed tool request
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub parameters: Map<String, Value>,
}

/// What a model reply turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallOutcome {
    /// No `<APIs>` block; the reply is the answer itself
    Absent,
    /// A well-formed tool request
    Call(ToolCall),
    /// An `<APIs>` block that could not be parsed; the tool loop still runs
    /// with an error payload as the function result
    Malformed { detail: String },
}

/// Scan a reply for a tool-call block.
///
/// A reply counts as a tool request only when both delimiters are present;
/// an opening tag that never closes reads as ordinary prose. The block body
/// may be a single object or a non-empty array; only the first block and
/// only its first array element are considered, since the decision prompt
/// asks for exactly one call per turn.
pub fn detect_tool_call(reply: &str) -> ToolCallOutcome {
    let Some(open) = reply.find(OPEN_TAG) else {
        return ToolCallOutcome::Absent;
    };
    let body_start = open + OPEN_TAG.len();

    let Some(close) = reply[body_start..].find(CLOSE_TAG) else {
        return ToolCallOutcome::Absent;
    };

    let body = reply[body_start..body_start + close].trim();
    let parsed: Value = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return ToolCallOutcome::Malformed {
                detail: format!("tool block is not JSON: {}", e),
            }
        }
    };

    let first = match &parsed {
        Value::Object(_) => Some(&parsed),
        Value::Array(calls) => calls.first(),
        _ => None,
    };
    let Some(first) = first else {
        return ToolCallOutcome::Malformed {
            detail: "tool block is neither an object nor a non-empty array".to_string(),
        };
    };
    let Some(call) = first.as_object() else {
        return ToolCallOutcome::Malformed {
            detail: "first tool entry is not an object".to_string(),
        };
    };

    let name = call
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TOOL_NAME)
        .to_string();
    let parameters = call
        .get("parameters")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    ToolCallOutcome::Call(ToolCall { name, parameters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_reply_is_absent() {
        assert_eq!(detect_tool_call("The answer is 42."), ToolCallOutcome::Absent);
        assert_eq!(detect_tool_call(""), ToolCallOutcome::Absent);
    }

    #[test]
    fn well_formed_block_parses() {
        let reply = r#"<APIs>[{"name": "web_search", "parameters": {"search_query": "rust 1.80 release date"}}]</APIs>"#;
        let ToolCallOutcome::Call(call) = detect_tool_call(reply) else {
            panic!("expected a call");
        };
        assert_eq!(call.name, "web_search");
        assert_eq!(
            call.parameters.get("search_query"),
            Some(&json!("rust 1.80 release date"))
        );
    }

    #[test]
    fn missing_name_defaults_to_web_search() {
        let reply = r#"<APIs>[{"parameters":{"search_query":"x"}}]</APIs>"#;
        let ToolCallOutcome::Call(call) = detect_tool_call(reply) else {
            panic!("expected a call");
        };
        assert_eq!(call.name, "web_search");
        assert_eq!(call.parameters.get("search_query"), Some(&json!("x")));
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let reply = "Let me look that up.\n<APIs>[{\"name\":\"web_search\",\"parameters\":{}}]</APIs>\nOne moment.";
        assert!(matches!(detect_tool_call(reply), ToolCallOutcome::Call(_)));
    }

    #[test]
    fn only_first_element_is_used() {
        let reply = r#"<APIs>[{"parameters":{"search_query":"first"}},{"parameters":{"search_query":"second"}}]</APIs>"#;
        let ToolCallOutcome::Call(call) = detect_tool_call(reply) else {
            panic!("expected a call");
        };
        assert_eq!(call.parameters.get("search_query"), Some(&json!("first")));
    }

    #[test]
    fn unterminated_block_is_absent() {
        // Both tags are required; a dangling open tag is ordinary prose,
        // not a broken call.
        assert_eq!(
            detect_tool_call(r#"<APIs>[{"parameters":{"search_query":"x"}}"#),
            ToolCallOutcome::Absent
        );
        assert_eq!(
            detect_tool_call(r#"<APIs>[{"name":"web_search"}"#),
            ToolCallOutcome::Absent
        );
    }

    #[test]
    fn non_json_body_is_malformed() {
        let reply = "<APIs>call the search tool please</APIs>";
        assert!(matches!(
            detect_tool_call(reply),
            ToolCallOutcome::Malformed { .. }
        ));
    }

    #[test]
    fn empty_array_is_malformed() {
        assert!(matches!(
            detect_tool_call("<APIs>[]</APIs>"),
            ToolCallOutcome::Malformed { .. }
        ));
        assert!(matches!(
            detect_tool_call("<APIs>\"web_search\"</APIs>"),
            ToolCallOutcome::Malformed { .. }
        ));
    }

    #[test]
    fn bare_object_body_parses_like_a_one_element_array() {
        let reply = r#"<APIs>{"name":"web_search","parameters":{"search_query":"solo"}}</APIs>"#;
        let ToolCallOutcome::Call(call) = detect_tool_call(reply) else {
            panic!("expected a call");
        };
        assert_eq!(call.parameters.get("search_query"), Some(&json!("solo")));
    }

    #[test]
    fn missing_parameters_default_to_empty() {
        let ToolCallOutcome::Call(call) = detect_tool_call(r#"<APIs>[{"name":"web_search"}]</APIs>"#)
        else {
            panic!("expected a call");
        };
        assert!(call.parameters.is_empty());
    }
}
