use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use campus_types::events::{GatewayCommand, GatewayEvent};
use campus_types::{
    ChannelRef, GroupId, GroupSummary, LastMessagePreview, Member, Message, UserId, Viewer,
};

use crate::api::Hydration;
use crate::config::SessionConfig;
use crate::error::{FetchError, SessionError};
use crate::timeline::Timeline;
use crate::transport::{Transport, TransportEvent};
use crate::typing::{TypingDebounce, TypingPresence};

/// Load state of the active channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No channel opened yet
    Idle,
    /// History fetch in flight; pushes for the channel are buffered
    Loading,
    Ready,
    /// History fetch failed. The channel stays open and usable but empty
    /// until reopened.
    Failed(FetchError),
}

/// Identifies one `open` call. Fetch results are applied only if their
/// ticket is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTicket {
    pub epoch: u64,
    pub channel: ChannelRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Transport was down; nothing was emitted and the input was kept.
    Offline,
}

/// Render state published after every event.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Bumped by every `open`, including a reopen of the same channel
    pub epoch: u64,
    pub channel: Option<ChannelRef>,
    pub channel_name: Option<String>,
    pub phase: Phase,
    pub messages: Vec<Message>,
    pub roster: Vec<Member>,
    pub typing: Vec<String>,
    pub groups: Vec<GroupSummary>,
    pub groups_error: Option<FetchError>,
    pub connected: bool,
    pub input: String,
}

/// Trim `text` and check it against the length limit. Over-long input is
/// rejected, never truncated.
pub fn validate_outgoing(text: &str, max_chars: usize) -> Result<&str, SessionError> {
    let content = text.trim();
    if content.is_empty() {
        return Err(SessionError::EmptyMessage);
    }
    let len = content.chars().count();
    if len > max_chars {
        return Err(SessionError::MessageTooLong { len, max: max_chars });
    }
    Ok(content)
}

/// Messaging state for exactly one active channel.
///
/// All methods are synchronous and never block. The only asynchronous part
/// of the protocol, the history fetch, is driven from outside: `open` hands
/// out an [`OpenTicket`] and the fetch result comes back through
/// [`ChatSession::apply_hydration`].
pub struct ChatSession<T> {
    viewer: Viewer,
    transport: T,
    config: SessionConfig,
    active: Option<ChannelRef>,
    epoch: u64,
    phase: Phase,
    timeline: Timeline,
    buffered: Vec<Message>,
    roster: Vec<Member>,
    channel_name: Option<String>,
    groups: Vec<GroupSummary>,
    groups_error: Option<FetchError>,
    typing: TypingPresence,
    debounce: TypingDebounce,
    input: String,
}

impl<T: Transport> ChatSession<T> {
    pub fn new(viewer: Viewer, transport: T, config: SessionConfig) -> Self {
        Self {
            typing: TypingPresence::new(config.typing_expiry),
            debounce: TypingDebounce::new(config.typing_debounce),
            viewer,
            transport,
            config,
            active: None,
            epoch: 0,
            phase: Phase::Idle,
            timeline: Timeline::new(),
            buffered: Vec::new(),
            roster: Vec::new(),
            channel_name: None,
            groups: Vec::new(),
            groups_error: None,
            input: String::new(),
        }
    }

    // -- Channel lifecycle --

    /// Make `channel` the active channel.
    ///
    /// Clears the timeline, roster and typing state, abandons the local
    /// typing timer without a stop signal, and joins the group on the
    /// gateway. The returned ticket must accompany the fetch result.
    pub fn open(&mut self, channel: ChannelRef) -> OpenTicket {
        self.epoch += 1;
        info!(channel = %channel, epoch = self.epoch, "Opening channel");

        self.phase = Phase::Loading;
        self.timeline.clear();
        self.buffered.clear();
        self.roster.clear();
        self.channel_name = None;
        self.typing.clear();
        self.debounce.cancel();

        if let Some(group_id) = channel.group_id() {
            self.join(group_id);
        }

        self.active = Some(channel.clone());
        OpenTicket {
            epoch: self.epoch,
            channel,
        }
    }

    /// Apply a history/roster result. Returns false if the ticket is stale,
    /// in which case nothing changes.
    pub fn apply_hydration(
        &mut self,
        ticket: &OpenTicket,
        result: Result<Hydration, FetchError>,
    ) -> bool {
        if ticket.epoch != self.epoch {
            debug!(
                channel = %ticket.channel,
                stale_epoch = ticket.epoch,
                epoch = self.epoch,
                "Discarding stale history"
            );
            return false;
        }

        match result {
            Ok(hydration) => {
                self.timeline.replace(hydration.messages);
                self.roster = hydration.members;
                self.channel_name = hydration.name;

                // Pushes that raced the fetch go after history; anything the
                // history already contained is dropped by id.
                let buffered = std::mem::take(&mut self.buffered);
                let held = buffered.len();
                let mut appended = 0;
                for message in buffered {
                    if self.timeline.push(message) {
                        appended += 1;
                    }
                }

                info!(
                    channel = %ticket.channel,
                    messages = self.timeline.len(),
                    members = self.roster.len(),
                    held,
                    appended,
                    "Channel ready"
                );
                self.phase = Phase::Ready;
            }
            Err(e) => {
                warn!(channel = %ticket.channel, "History fetch failed: {}", e);
                self.timeline.clear();
                self.buffered.clear();
                self.phase = Phase::Failed(e);
            }
        }
        true
    }

    // -- Inbound --

    /// Route a transport event into the session.
    pub fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.set_connected(true),
            TransportEvent::Disconnected => self.set_connected(false),
            TransportEvent::Event(event) => self.handle_event(event),
        }
    }

    pub fn handle_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { user_id } => {
                if user_id != self.viewer.id {
                    warn!(gateway = %user_id, viewer = %self.viewer.id, "Gateway identified a different user");
                }
            }
            GatewayEvent::MessageCreate { message } => {
                self.receive_push(message);
            }
            GatewayEvent::TypingStart {
                channel,
                user_id,
                display_name,
            } => {
                self.receive_typing(&channel, &user_id, &display_name);
            }
            GatewayEvent::TypingStop { channel, user_id } => {
                self.receive_typing_stop(&channel, &user_id);
            }
            GatewayEvent::Error { message } => {
                warn!("Gateway error: {}", message);
            }
        }
    }

    /// Accept a pushed message. Returns true if it was appended to the
    /// visible timeline.
    pub fn receive_push(&mut self, message: Message) -> bool {
        if let ChannelRef::Group { group_id } = &message.channel {
            self.update_preview(group_id, &message);
        }

        if self.active.as_ref() != Some(&message.channel) {
            trace!(channel = %message.channel, id = %message.id, "Push for inactive channel");
            return false;
        }

        match self.phase {
            Phase::Loading => {
                if !self.buffered.iter().any(|held| held.id == message.id) {
                    trace!(id = %message.id, "Holding push until history arrives");
                    self.buffered.push(message);
                }
                false
            }
            _ => {
                let id = message.id.clone();
                let appended = self.timeline.push(message);
                if !appended {
                    trace!(id = %id, "Duplicate push absorbed");
                }
                appended
            }
        }
    }

    /// A peer started typing. The viewer's own signal echoed back is ignored.
    pub fn receive_typing(&mut self, channel: &ChannelRef, user: &UserId, display_name: &str) -> bool {
        if self.active.as_ref() != Some(channel) || *user == self.viewer.id {
            return false;
        }
        self.typing
            .start(user.clone(), display_name.to_string(), Instant::now())
    }

    pub fn receive_typing_stop(&mut self, channel: &ChannelRef, user: &UserId) -> bool {
        if self.active.as_ref() != Some(channel) {
            return false;
        }
        self.typing.stop(user).is_some()
    }

    /// Connectivity changed. The transport's own flag is authoritative for
    /// sending; this only runs the side effects of the transition.
    pub fn set_connected(&mut self, connected: bool) {
        if connected {
            self.on_connected();
        } else {
            self.on_disconnected();
        }
    }

    fn on_connected(&mut self) {
        info!("Gateway connected");
        // Group scoping does not survive a reconnect
        if let Some(group_id) = self.active.as_ref().and_then(ChannelRef::group_id).cloned() {
            self.join(&group_id);
        }
    }

    fn on_disconnected(&mut self) {
        warn!("Gateway disconnected; sending disabled");
        self.debounce.cancel();
    }

    // -- Outbound --

    /// Send `text` to the active channel.
    ///
    /// The message is not appended locally; it comes back through
    /// [`ChatSession::receive_push`] like everyone else's.
    pub fn send_message(&mut self, text: &str) -> Result<SendOutcome, SessionError> {
        let channel = self.active.clone().ok_or(SessionError::NoActiveChannel)?;
        let content = validate_outgoing(text, self.config.max_message_chars)?.to_string();

        if !self.transport.is_connected() {
            debug!(channel = %channel, "Send ignored while disconnected");
            return Ok(SendOutcome::Offline);
        }

        self.transport.emit(GatewayCommand::SendMessage {
            channel: channel.clone(),
            content,
        });
        self.transport.emit(GatewayCommand::StopTyping { channel });
        self.debounce.cancel();
        self.input.clear();
        Ok(SendOutcome::Sent)
    }

    /// Record an input change. Non-blank input emits StartTyping on every
    /// call and re-arms the local stop timer; clearing the input sends the
    /// stop right away.
    pub fn notify_typing(&mut self, text: &str) {
        self.input = text.to_string();

        let Some(channel) = self.active.clone() else {
            return;
        };
        if !self.transport.is_connected() {
            return;
        }

        if text.trim().is_empty() {
            if let Some(armed) = self.debounce.cancel() {
                self.transport.emit(GatewayCommand::StopTyping { channel: armed });
            }
            return;
        }

        self.transport.emit(GatewayCommand::StartTyping {
            channel: channel.clone(),
        });
        self.debounce.arm(channel, Instant::now());
    }

    // -- Timers --

    /// Earliest pending deadline across remote presence and the local
    /// debounce timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.typing.next_deadline(), self.debounce.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire every timer due at `now`.
    pub fn fire_timers(&mut self, now: Instant) {
        for name in self.typing.expire(now) {
            trace!(name = %name, "Typing indicator expired");
        }

        if let Some(channel) = self.debounce.take_due(now) {
            if self.transport.is_connected() && self.active.as_ref() == Some(&channel) {
                self.transport.emit(GatewayCommand::StopTyping { channel });
            }
        }
    }

    // -- Group list --

    pub fn apply_groups(&mut self, result: Result<Vec<GroupSummary>, FetchError>) {
        match result {
            Ok(groups) => {
                debug!(count = groups.len(), "Group list refreshed");
                self.groups = groups;
                self.groups_error = None;
            }
            Err(e) => self.record_group_error(e),
        }
    }

    pub fn record_group_error(&mut self, error: FetchError) {
        warn!("Group request failed: {}", error);
        self.groups_error = Some(error);
    }

    fn update_preview(&mut self, group_id: &GroupId, message: &Message) {
        let Some(group) = self.groups.iter_mut().find(|g| g.id == *group_id) else {
            return;
        };
        let newer = group
            .last_message
            .as_ref()
            .is_none_or(|preview| preview.created_at <= message.created_at);
        if newer {
            group.last_message = Some(LastMessagePreview {
                content: message.content.clone(),
                created_at: message.created_at,
            });
        }
    }

    fn join(&self, group_id: &GroupId) {
        if self.transport.is_connected() {
            self.transport.emit(GatewayCommand::JoinGroup {
                group_id: group_id.clone(),
            });
        } else {
            debug!(group = %group_id, "Join deferred until the gateway reconnects");
        }
    }

    // -- Observers --

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn active(&self) -> Option<&ChannelRef> {
        self.active.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn timeline(&self) -> &[Message] {
        self.timeline.messages()
    }

    pub fn roster(&self) -> &[Member] {
        &self.roster
    }

    pub fn groups(&self) -> &[GroupSummary] {
        &self.groups
    }

    pub fn typing_names(&self) -> Vec<String> {
        self.typing.names()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            epoch: self.epoch,
            channel: self.active.clone(),
            channel_name: self.channel_name.clone(),
            phase: self.phase.clone(),
            messages: self.timeline.messages().to_vec(),
            roster: self.roster.clone(),
            typing: self.typing.names(),
            groups: self.groups.clone(),
            groups_error: self.groups_error.clone(),
            connected: self.transport.is_connected(),
            input: self.input.clone(),
        }
    }
}
