// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire bodies for `POST /messages`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct MessagesBody {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Stored history followed by the new user turn.
    pub messages: Vec<Turn>,
}

/// One conversation turn; `role` is `user` or `assistant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesReply {
    pub id: String,
    pub model: String,
    pub content: Vec<Block>,
}

impl MessagesReply {
    /// Text blocks joined in order; tool calls and other blocks are dropped.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let Block::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text { text: String },
    #[serde(other)]
    Unsupported,
}

/// `{"type": "error", "error": {"type": ..., "message": ...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_is_optional_on_the_wire() {
        let body = MessagesBody {
            model: "claude-3-haiku-20240307".into(),
            max_tokens: 256,
            temperature: 0.2,
            system: None,
            messages: vec![Turn::user("hi")],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn reply_text_joins_text_blocks_only() {
        let reply: MessagesReply = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "model": "claude-3-opus-20240229",
            "content": [
                {"type": "text", "text": "Bonjour"},
                {"type": "tool_use", "id": "t1", "name": "lookup", "input": {}},
                {"type": "text", "text": ", monde"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(reply.text(), "Bonjour, monde");
    }

    #[test]
    fn error_envelope_decodes_kind() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.error.kind, "rate_limit_error");
    }
}
