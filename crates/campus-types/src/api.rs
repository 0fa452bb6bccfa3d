use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, UserId};
use crate::models::{Member, Message, Viewer};

// -- Token claims --

/// The subset of JWT claims the client reads from its own token.
/// The signature is verified by the backend, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

// -- Auth --

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(alias = "profile")]
    pub user: Viewer,
}

// -- Chat --

/// Full hydration payload for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupHistory {
    #[serde(alias = "groupName")]
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub member_ids: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupResponse {
    #[serde(alias = "_id", alias = "groupId")]
    pub id: GroupId,
}
