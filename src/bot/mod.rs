/// Chat-platform boundary types
///
/// The real messenger transport is an external collaborator: it delivers
/// updates shaped like `ChatUpdate` and is handed back the `Reply` values to
/// send. Keeping both as plain serde types keeps the engine independent of
/// any particular platform SDK.
use serde::{Deserialize, Serialize};

pub mod engine;
pub mod session;

pub use engine::BotEngine;
pub use session::SessionStore;

/// One incoming user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatUpdate {
    /// Free text or a slash command typed in the chat
    Message { chat_id: i64, text: String },
    /// An inline button press with its opaque payload
    Callback { chat_id: i64, data: String },
}

impl ChatUpdate {
    pub fn chat_id(&self) -> i64 {
        match self {
            ChatUpdate::Message { chat_id, .. } => *chat_id,
            ChatUpdate::Callback { chat_id, .. } => *chat_id,
        }
    }
}

/// One outgoing reply for the transport to deliver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text {
        text: String,
    },
    /// A poster with a caption; the transport fetches the image itself
    Photo {
        photo_url: Option<String>,
        caption: String,
    },
    /// Text with an inline keyboard underneath
    Menu {
        text: String,
        buttons: Vec<Button>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_update_deserialization() {
        let json = r#"{"kind": "message", "chat_id": 99, "text": "movie"}"#;
        let update: ChatUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(
            update,
            ChatUpdate::Message {
                chat_id: 99,
                text: "movie".to_string()
            }
        );
        assert_eq!(update.chat_id(), 99);
    }

    #[test]
    fn test_callback_deserialization() {
        let json = r#"{"kind": "callback", "chat_id": 7, "data": "randommovies"}"#;
        let update: ChatUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(
            update,
            ChatUpdate::Callback {
                chat_id: 7,
                data: "randommovies".to_string()
            }
        );
    }

    #[test]
    fn test_reply_serialization_tags_kind() {
        let reply = Reply::Photo {
            photo_url: Some("https://image.tmdb.org/t/p/original/x.jpg".to_string()),
            caption: "Release Year: 2020".to_string(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["kind"], "photo");
        assert_eq!(json["caption"], "Release Year: 2020");
    }
}
