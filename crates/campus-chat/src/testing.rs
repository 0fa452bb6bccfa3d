//! Fakes shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use campus_types::api::GroupHistory;
use campus_types::events::GatewayCommand;
use campus_types::{ChannelRef, GroupId, GroupSummary, Member, Message, MessageId, Role, Sender, UserId, Viewer};

use crate::api::ChatApi;
use crate::error::FetchError;
use crate::transport::Transport;

pub fn message(id: &str, channel: ChannelRef, sender: &str) -> Message {
    Message {
        id: MessageId::new(id),
        sender: Sender {
            id: UserId::new(sender),
            display_name: format!("User {}", sender),
            avatar: None,
            role: Role::Student,
        },
        content: format!("body of {}", id),
        channel,
        created_at: Utc::now(),
    }
}

pub fn member(id: &str, first: &str) -> Member {
    Member {
        id: UserId::new(id),
        first_name: first.to_string(),
        last_name: String::new(),
        role: Role::Student,
        avatar: None,
    }
}

pub fn viewer(id: &str) -> Viewer {
    Viewer {
        id: UserId::new(id),
        first_name: "Viewer".to_string(),
        last_name: id.to_string(),
        department: Some("Computer Science".to_string()),
        role: Role::Student,
    }
}

/// Transport that records every command it would have sent.
#[derive(Clone)]
pub struct RecordingTransport {
    connected: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<(Instant, GatewayCommand)>>>,
}

impl RecordingTransport {
    pub fn connected() -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(true)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn disconnected() -> Self {
        let transport = Self::connected();
        transport.set_connected(false);
        transport
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<GatewayCommand> {
        self.timed().into_iter().map(|(_, cmd)| cmd).collect()
    }

    pub fn timed(&self) -> Vec<(Instant, GatewayCommand)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Transport for RecordingTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn emit(&self, command: GatewayCommand) {
        if self.is_connected() {
            self.sent.lock().unwrap().push((Instant::now(), command));
        }
    }
}

/// In-memory backend with per-channel latency and failure injection.
#[derive(Default)]
pub struct FakeApi {
    forum: Vec<Message>,
    roster: Vec<Member>,
    groups: HashMap<GroupId, GroupHistory>,
    summaries: Vec<GroupSummary>,
    delays: HashMap<ChannelRef, Duration>,
    /// Remaining failures per channel
    failing: Mutex<HashMap<ChannelRef, usize>>,
    next_group: Option<GroupId>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forum(mut self, messages: Vec<Message>, roster: Vec<Member>) -> Self {
        self.forum = messages;
        self.roster = roster;
        self
    }

    pub fn with_group(mut self, id: &str, name: &str, messages: Vec<Message>, members: Vec<Member>) -> Self {
        self.summaries.push(GroupSummary {
            id: GroupId::new(id),
            name: name.to_string(),
            member_count: members.len(),
            last_message: None,
        });
        self.groups.insert(
            GroupId::new(id),
            GroupHistory {
                name: name.to_string(),
                members,
                messages,
            },
        );
        self
    }

    pub fn with_delay(mut self, channel: ChannelRef, delay: Duration) -> Self {
        self.delays.insert(channel, delay);
        self
    }

    /// Fail the next `times` history fetches for `channel` with a 503.
    pub fn failing(self, channel: ChannelRef, times: usize) -> Self {
        self.failing.lock().unwrap().insert(channel, times);
        self
    }

    pub fn creating(mut self, id: &str) -> Self {
        self.next_group = Some(GroupId::new(id));
        self
    }

    async fn respond(&self, channel: &ChannelRef) -> Result<(), FetchError> {
        if let Some(delay) = self.delays.get(channel) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(remaining) = self.failing.lock().unwrap().get_mut(channel) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Status { status: 503 });
            }
        }
        Ok(())
    }
}

impl ChatApi for FakeApi {
    async fn forum_history(&self) -> Result<Vec<Message>, FetchError> {
        self.respond(&ChannelRef::Forum).await?;
        Ok(self.forum.clone())
    }

    async fn department_roster(&self) -> Result<Vec<Member>, FetchError> {
        Ok(self.roster.clone())
    }

    async fn group_history(&self, group_id: &GroupId) -> Result<GroupHistory, FetchError> {
        self.respond(&ChannelRef::Group {
            group_id: group_id.clone(),
        })
        .await?;
        self.groups
            .get(group_id)
            .cloned()
            .ok_or(FetchError::Status { status: 404 })
    }

    async fn groups(&self) -> Result<Vec<GroupSummary>, FetchError> {
        Ok(self.summaries.clone())
    }

    async fn create_group(&self, _name: &str, _member_ids: &[UserId]) -> Result<GroupId, FetchError> {
        self.next_group.clone().ok_or(FetchError::Status { status: 500 })
    }
}
