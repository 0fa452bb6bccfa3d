use std::future::Future;

use campus_types::api::GroupHistory;
use campus_types::{ChannelRef, GroupId, GroupSummary, Member, Message, UserId};

use crate::error::FetchError;

/// Request/response side of the backend.
///
/// Futures must be `Send` so the driver can keep several in flight while a
/// channel switch is underway.
pub trait ChatApi: Send + Sync + 'static {
    fn forum_history(&self) -> impl Future<Output = Result<Vec<Message>, FetchError>> + Send;

    fn department_roster(&self) -> impl Future<Output = Result<Vec<Member>, FetchError>> + Send;

    fn group_history(
        &self,
        group_id: &GroupId,
    ) -> impl Future<Output = Result<GroupHistory, FetchError>> + Send;

    fn groups(&self) -> impl Future<Output = Result<Vec<GroupSummary>, FetchError>> + Send;

    fn create_group(
        &self,
        name: &str,
        member_ids: &[UserId],
    ) -> impl Future<Output = Result<GroupId, FetchError>> + Send;
}

/// Everything `open` needs to render a channel.
#[derive(Debug, Clone, Default)]
pub struct Hydration {
    pub messages: Vec<Message>,
    pub members: Vec<Member>,
    pub name: Option<String>,
}

/// Fetch history and roster for `channel`. The forum needs two requests
/// (history and department roster), issued concurrently.
pub async fn hydrate<A: ChatApi>(api: &A, channel: &ChannelRef) -> Result<Hydration, FetchError> {
    match channel {
        ChannelRef::Forum => {
            let (messages, members) =
                futures_util::try_join!(api.forum_history(), api.department_roster())?;
            Ok(Hydration {
                messages,
                members,
                name: None,
            })
        }
        ChannelRef::Group { group_id } => {
            let group = api.group_history(group_id).await?;
            Ok(Hydration {
                messages: group.messages,
                members: group.members,
                name: Some(group.name),
            })
        }
    }
}
