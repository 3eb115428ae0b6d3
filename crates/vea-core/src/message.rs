//! Conversation Messages
//!
//! Standard message format used across the agent system.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response, possibly carrying tool calls
    Assistant,
    /// Tool result answering one assistant tool call
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content (serialized tool output for tool messages)
    pub content: String,

    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Call this tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool name (for tool messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Optional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Additional message metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Model that generated this (for assistant messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom key-value pairs
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = calls;
        msg
    }

    /// Create a tool result message
    pub fn tool(result: &ToolResult) -> Self {
        let mut msg = Self::new(Role::Tool, result.to_message_content());
        msg.tool_call_id = Some(result.id.clone());
        msg.name = Some(result.name.clone());
        msg
    }

    /// Record which model produced this message
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(MessageMetadata::default)
            .model = Some(model.into());
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Conversation history with utility methods
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append several messages in order
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Content of the most recent user message, skipping any assistant
    /// or tool messages appended after it
    pub fn last_user_text(&self) -> Option<&str> {
        last_user_text(&self.messages)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Scan backwards for the most recent non-blank user message.
pub fn last_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User && !m.content.trim().is_empty())
        .map(|m| m.content.as_str())
}

/// Check that every tool message answers exactly one earlier assistant tool
/// call, and that every tool call has been answered.
///
/// A transcript that fails this check must not be sent to the model.
pub fn verify_tool_pairing(messages: &[Message]) -> Result<()> {
    let mut issued: HashSet<&str> = HashSet::new();
    let mut outstanding: Vec<&str> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::Assistant => {
                if let Some(open) = outstanding.first() {
                    return Err(AgentError::MalformedTranscript(format!(
                        "tool call '{open}' unanswered before next assistant turn"
                    )));
                }
                for call in &msg.tool_calls {
                    if !issued.insert(call.id.as_str()) {
                        return Err(AgentError::MalformedTranscript(format!(
                            "tool call id '{}' issued twice",
                            call.id
                        )));
                    }
                    outstanding.push(call.id.as_str());
                }
            }
            Role::Tool => {
                let Some(id) = msg.tool_call_id.as_deref() else {
                    return Err(AgentError::MalformedTranscript(
                        "tool message without tool_call_id".into(),
                    ));
                };
                let Some(pos) = outstanding.iter().position(|open| *open == id) else {
                    return Err(AgentError::MalformedTranscript(format!(
                        "tool message answers unknown or already answered call '{id}'"
                    )));
                };
                outstanding.remove(pos);
            }
            Role::System | Role::User => {
                if let Some(open) = outstanding.first() {
                    return Err(AgentError::MalformedTranscript(format!(
                        "tool call '{open}' unanswered before {} message",
                        msg.role
                    )));
                }
            }
        }
    }

    match outstanding.first() {
        Some(open) => Err(AgentError::MalformedTranscript(format!(
            "tool call '{open}' unanswered"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolCall;

    fn call(id: &str) -> ToolCall {
        ToolCall::new("basic_calculator", serde_json::Map::new()).with_id(id)
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_last_user_text_skips_tool_exchange() {
        let mut conv = Conversation::new();
        conv.push(Message::user("first"));
        conv.push(Message::assistant("ok"));
        conv.push(Message::user("What is 2 + 2?"));
        conv.push(Message::assistant_with_tool_calls("", vec![call("c1")]));
        conv.push(Message::tool(&ToolResult::success("basic_calculator", "4").with_id("c1")));

        assert_eq!(conv.last_user_text(), Some("What is 2 + 2?"));
        assert_eq!(conv.last().map(|m| m.role), Some(Role::Tool));
    }

    #[test]
    fn test_last_user_text_missing() {
        let messages = vec![Message::assistant("hi")];
        assert_eq!(last_user_text(&messages), None);
    }

    #[test]
    fn test_last_user_text_skips_blank_user_messages() {
        let messages = vec![
            Message::user("What does this sign say?"),
            Message::assistant("It says STOP."),
            Message::user("  "),
        ];
        assert_eq!(last_user_text(&messages), Some("What does this sign say?"));
        assert_eq!(last_user_text(&messages[2..]), None);
    }

    #[test]
    fn test_pairing_accepts_answered_calls_in_order() {
        let mut messages = vec![Message::user("go")];
        for i in 0..5 {
            let id = format!("c{i}");
            messages.push(Message::assistant_with_tool_calls("", vec![call(&id)]));
            messages.push(Message::tool(&ToolResult::success("basic_calculator", "1").with_id(id)));
        }
        messages.push(Message::assistant("done"));

        assert!(verify_tool_pairing(&messages).is_ok());

        let answered: Vec<_> = messages
            .iter()
            .filter_map(|m| m.tool_call_id.clone())
            .collect();
        assert_eq!(answered, vec!["c0", "c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn test_pairing_rejects_dangling_call() {
        let messages = vec![
            Message::user("go"),
            Message::assistant_with_tool_calls("", vec![call("c1"), call("c2")]),
            Message::tool(&ToolResult::success("basic_calculator", "1").with_id("c1")),
        ];
        assert!(matches!(
            verify_tool_pairing(&messages),
            Err(AgentError::MalformedTranscript(_))
        ));
    }

    #[test]
    fn test_pairing_rejects_orphan_and_duplicate_answers() {
        let orphan = vec![
            Message::user("go"),
            Message::tool(&ToolResult::success("basic_calculator", "1").with_id("ghost")),
        ];
        assert!(verify_tool_pairing(&orphan).is_err());

        let twice = vec![
            Message::user("go"),
            Message::assistant_with_tool_calls("", vec![call("c1")]),
            Message::tool(&ToolResult::success("basic_calculator", "1").with_id("c1")),
            Message::tool(&ToolResult::success("basic_calculator", "1").with_id("c1")),
        ];
        assert!(verify_tool_pairing(&twice).is_err());
    }
}
