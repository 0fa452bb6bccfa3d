use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, MessageId, UserId};

/// Longest message body the portal accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Portal role tag. Only the student/non-student split drives behaviour;
/// the remaining variants are kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Student,
    Faculty,
    Counselor,
    Staff,
    Admin,
    Other(String),
}

impl Role {
    pub fn is_student(&self) -> bool {
        matches!(self, Role::Student)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Other("unknown".to_string())
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Role::Student,
            "faculty" | "teacher" => Role::Faculty,
            "counselor" | "counsellor" => Role::Counselor,
            "staff" => Role::Staff,
            "admin" => Role::Admin,
            _ => Role::Other(raw),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => "student".to_string(),
            Role::Faculty => "faculty".to_string(),
            Role::Counselor => "counselor".to_string(),
            Role::Staff => "staff".to_string(),
            Role::Admin => "admin".to_string(),
            Role::Other(raw) => raw,
        }
    }
}

/// Addressable chat context: the viewer's department forum or one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelRef {
    Forum,
    Group {
        #[serde(alias = "groupId")]
        group_id: GroupId,
    },
}

impl ChannelRef {
    pub fn group(group_id: impl Into<GroupId>) -> Self {
        ChannelRef::Group {
            group_id: group_id.into(),
        }
    }

    pub fn group_id(&self) -> Option<&GroupId> {
        match self {
            ChannelRef::Forum => None,
            ChannelRef::Group { group_id } => Some(group_id),
        }
    }

    pub fn is_forum(&self) -> bool {
        matches!(self, ChannelRef::Forum)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Forum => f.write_str("forum"),
            ChannelRef::Group { group_id } => write!(f, "group:{}", group_id),
        }
    }
}

/// Message author as resolved by the server at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSender")]
pub struct Sender {
    pub id: UserId,
    pub display_name: String,
    pub avatar: Option<String>,
    pub role: Role,
}

/// Senders arrive either with a ready display name or with name parts.
#[derive(Deserialize)]
struct RawSender {
    #[serde(alias = "_id")]
    id: UserId,
    #[serde(default, alias = "displayName", alias = "name")]
    display_name: Option<String>,
    #[serde(default, alias = "firstName")]
    first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    last_name: Option<String>,
    #[serde(default, alias = "profilePicture")]
    avatar: Option<String>,
    #[serde(default)]
    role: Role,
}

impl From<RawSender> for Sender {
    fn from(raw: RawSender) -> Self {
        let display_name = raw
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| join_name(raw.first_name.as_deref(), raw.last_name.as_deref()));
        Self {
            id: raw.id,
            display_name,
            avatar: raw.avatar,
            role: raw.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub channel: ChannelRef,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Roster entry for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, alias = "profilePicture")]
    pub avatar: Option<String>,
}

impl Member {
    pub fn display_name(&self) -> String {
        join_name(Some(&self.first_name), Some(&self.last_name))
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Viewer {
    pub fn display_name(&self) -> String {
        join_name(Some(&self.first_name), Some(&self.last_name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessagePreview {
    pub content: String,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Entry in the viewer's group list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    #[serde(alias = "_id")]
    pub id: GroupId,
    pub name: String,
    #[serde(default, alias = "memberCount")]
    pub member_count: usize,
    #[serde(default, alias = "lastMessage")]
    pub last_message: Option<LastMessagePreview>,
}

fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
