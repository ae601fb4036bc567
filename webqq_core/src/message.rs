//! Inbound message events delivered by the long-poll channel.
//!
//! Each entry of a poll result carries a `poll_type` discriminator selecting
//! the event shape; entries are delivered in server order.

use serde_json::Value;
use tracing::debug;

use crate::content::{parse_content, ContentElement, Font};

/// A private message from a friend.
#[derive(Debug, Clone)]
pub struct FriendMessage {
    /// Internal id of the sending account.
    pub user_id: i64,
    /// Server timestamp, seconds.
    pub time: i64,
    pub content: Vec<ContentElement>,
    pub font: Option<Font>,
}

/// A message posted in a group.
#[derive(Debug, Clone)]
pub struct GroupMessage {
    /// Internal id of the group.
    pub group_id: i64,
    /// Internal id of the sending member.
    pub user_id: i64,
    /// Server timestamp, seconds.
    pub time: i64,
    pub content: Vec<ContentElement>,
    pub font: Option<Font>,
}

/// A message posted in a multi-user discussion.
#[derive(Debug, Clone)]
pub struct DiscussMessage {
    /// Internal id of the discussion.
    pub discuss_id: i64,
    /// Internal id of the sending member.
    pub user_id: i64,
    /// Server timestamp, seconds.
    pub time: i64,
    pub content: Vec<ContentElement>,
    pub font: Option<Font>,
}

/// One event from a poll round.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A private message arrived.
    Message(FriendMessage),
    /// A group message arrived.
    GroupMessage(GroupMessage),
    /// A discussion message arrived.
    DiscussMessage(DiscussMessage),
}

/// Parse the `result` array of a poll envelope, preserving server order.
/// Entries with an unknown `poll_type` are skipped.
#[must_use]
pub fn parse_poll_events(result: &Value) -> Vec<PollEvent> {
    let Some(items) = result.as_array() else {
        return Vec::new();
    };
    let mut events = Vec::with_capacity(items.len());
    for item in items {
        let Some(kind) = item.get("poll_type").and_then(Value::as_str) else {
            debug!("poll entry without poll_type, skipping");
            continue;
        };
        let value = item.get("value").cloned().unwrap_or(Value::Null);
        match kind {
            "message" => events.push(PollEvent::Message(FriendMessage::from_value(&value))),
            "group_message" => {
                events.push(PollEvent::GroupMessage(GroupMessage::from_value(&value)));
            }
            "discu_message" => {
                events.push(PollEvent::DiscussMessage(DiscussMessage::from_value(&value)));
            }
            other => debug!(poll_type = other, "skipping unknown poll event type"),
        }
    }
    events
}

impl FriendMessage {
    fn from_value(value: &Value) -> Self {
        let (content, font) = parse_content(value.get("content").unwrap_or(&Value::Null));
        Self {
            user_id: field_i64(value, "from_uin"),
            time: field_i64(value, "time"),
            content,
            font,
        }
    }
}

impl GroupMessage {
    fn from_value(value: &Value) -> Self {
        let (content, font) = parse_content(value.get("content").unwrap_or(&Value::Null));
        Self {
            group_id: field_i64(value, "from_uin"),
            user_id: field_i64(value, "send_uin"),
            time: field_i64(value, "time"),
            content,
            font,
        }
    }
}

impl DiscussMessage {
    fn from_value(value: &Value) -> Self {
        let (content, font) = parse_content(value.get("content").unwrap_or(&Value::Null));
        Self {
            discuss_id: field_i64(value, "did"),
            user_id: field_i64(value, "send_uin"),
            time: field_i64(value, "time"),
            content,
            font,
        }
    }
}

fn field_i64(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or_default()
}
