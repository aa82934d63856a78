//! Activity and conversation-reference model.
//!
//! An activity is one event (message, trace, delay, ...) flowing in or out
//! of a conversation. A conversation reference is the durable addressing
//! record that lets new activities be aimed at the same conversation later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of an activity; drives how the adapter delivers it.
/// Channel-defined tags outside the well-known set map to `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Message,
    Trace,
    Delay,
    Typing,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Message => f.write_str("message"),
            ActivityType::Trace => f.write_str("trace"),
            ActivityType::Delay => f.write_str("delay"),
            ActivityType::Typing => f.write_str("typing"),
            ActivityType::Other(tag) => f.write_str(tag),
        }
    }
}

/// An attachment carried by a message activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A user or bot participating in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_group: bool,
}

/// One conversational event. Addressing fields are merged in from a
/// [`ConversationReference`] before the activity reaches any middleware.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Absent on proactive turns (no inbound event to type it).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,

    /// Sequence id, assigned monotonically per adapter instance for
    /// inbound activities; absent on proactive and outbound activities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Payload for non-text types (delay duration in milliseconds, etc).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
}

impl Activity {
    /// A text message activity.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            activity_type: Some(ActivityType::Message),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A delay activity: delivery of the rest of the batch is suspended
    /// for `milliseconds`.
    pub fn delay(milliseconds: u64) -> Self {
        Self {
            activity_type: Some(ActivityType::Delay),
            value: Some(serde_json::json!(milliseconds)),
            ..Self::default()
        }
    }

    /// A typing indicator activity.
    pub fn typing() -> Self {
        Self {
            activity_type: Some(ActivityType::Typing),
            ..Self::default()
        }
    }
}

/// Durable addressing for a conversation, independent of any one activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReference {
    pub channel_id: String,
    pub user: ChannelAccount,
    pub bot: ChannelAccount,
    pub conversation: ConversationAccount,
    #[serde(default)]
    pub service_url: String,
}

/// Merge addressing fields from `reference` into `activity` (pure; the
/// reference is never mutated). `incoming` selects the direction:
/// inbound activities come from the user, outbound ones from the bot.
pub fn apply_conversation_reference(
    mut activity: Activity,
    reference: &ConversationReference,
    incoming: bool,
) -> Activity {
    activity.channel_id = Some(reference.channel_id.clone());
    activity.conversation = Some(reference.conversation.clone());
    activity.service_url = Some(reference.service_url.clone());
    if incoming {
        activity.from = Some(reference.user.clone());
        activity.recipient = Some(reference.bot.clone());
    } else {
        activity.from = Some(reference.bot.clone());
        activity.recipient = Some(reference.user.clone());
    }
    activity
}

/// Capture the conversation reference from an addressed activity, so a
/// proactive turn can be aimed at the same conversation later.
pub fn conversation_reference(activity: &Activity) -> ConversationReference {
    ConversationReference {
        channel_id: activity.channel_id.clone().unwrap_or_default(),
        user: activity.from.clone().unwrap_or_default(),
        bot: activity.recipient.clone().unwrap_or_default(),
        conversation: activity.conversation.clone().unwrap_or_default(),
        service_url: activity.service_url.clone().unwrap_or_default(),
    }
}
