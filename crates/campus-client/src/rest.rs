//! REST client for the portal backend.

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use campus_chat::FetchError;
use campus_chat::api::ChatApi;
use campus_types::api::{
    CreateGroupRequest, CreateGroupResponse, GroupHistory, LoginRequest, LoginResponse,
};
use campus_types::{GroupId, GroupSummary, Member, Message, UserId};

use crate::error::ClientError;

/// Longest error body kept in [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl RestClient {
    /// `base_url` is the API root, e.g. `https://portal.example.edu/api`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Exchange email and password for a bearer token and the viewer profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(self.endpoint("auth/login")?).json(&body);
        let login: LoginResponse = self.execute(request).await?;
        debug!(user = %login.user.id, "Logged in");
        Ok(login)
    }

    pub async fn forum_messages(&self) -> Result<Vec<Message>, ClientError> {
        self.get(self.endpoint("chat/forum/messages")?).await
    }

    pub async fn forum_members(&self) -> Result<Vec<Member>, ClientError> {
        self.get(self.endpoint("chat/forum/members")?).await
    }

    pub async fn group(&self, group_id: &GroupId) -> Result<GroupHistory, ClientError> {
        let mut url = self.endpoint("chat/groups")?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(group_id.as_str());
        }
        self.get(url).await
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupSummary>, ClientError> {
        self.get(self.endpoint("chat/groups")?).await
    }

    pub async fn new_group(&self, name: &str, member_ids: &[UserId]) -> Result<GroupId, ClientError> {
        let body = CreateGroupRequest {
            name: name.to_string(),
            member_ids: member_ids.to_vec(),
        };
        let created: CreateGroupResponse = self.post(self.endpoint("chat/groups")?, &body).await?;
        Ok(created.id)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let request = self.authorized(self.http.get(url))?;
        self.execute(request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, url: Url, body: &B) -> Result<T, ClientError> {
        let request = self.authorized(self.http.post(url).json(body))?;
        self.execute(request).await
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
        Ok(request.bearer_auth(token))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request_id = Uuid::new_v4();
        let response = request
            .header("X-Request-Id", request_id.to_string())
            .send()
            .await?;
        trace!(%request_id, status = %response.status(), url = %response.url(), "Response");
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl ChatApi for RestClient {
    async fn forum_history(&self) -> Result<Vec<Message>, FetchError> {
        Ok(self.forum_messages().await?)
    }

    async fn department_roster(&self) -> Result<Vec<Member>, FetchError> {
        Ok(self.forum_members().await?)
    }

    async fn group_history(&self, group_id: &GroupId) -> Result<GroupHistory, FetchError> {
        Ok(self.group(group_id).await?)
    }

    async fn groups(&self) -> Result<Vec<GroupSummary>, FetchError> {
        Ok(self.list_groups().await?)
    }

    async fn create_group(&self, name: &str, member_ids: &[UserId]) -> Result<GroupId, FetchError> {
        Ok(self.new_group(name, member_ids).await?)
    }
}
