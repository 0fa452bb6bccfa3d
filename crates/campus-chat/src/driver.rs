//! Single-task event loop around [`ChatSession`].
//!
//! Every state transition happens on the driver task, one event at a time:
//! caller commands, gateway events, fetch completions and timer expiries are
//! multiplexed with `select!`. Callers never block; they enqueue commands on a
//! [`SessionHandle`] and observe the published [`SessionSnapshot`]s.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use campus_types::{ChannelRef, GroupId, GroupSummary, UserId};

use crate::api::{ChatApi, Hydration, hydrate};
use crate::error::{FetchError, SessionError};
use crate::session::{ChatSession, OpenTicket, SendOutcome, SessionSnapshot, validate_outgoing};
use crate::transport::{Transport, TransportEvent};

#[derive(Debug, Clone)]
pub enum SessionCommand {
    Open(ChannelRef),
    Send(String),
    Typing(String),
    RefreshGroups,
    /// Create a group, refresh the group list, then open the new group
    CreateGroup { name: String, member_ids: Vec<UserId> },
    Shutdown,
}

/// Result of a request the driver issued. Requests are never cancelled;
/// results that no longer apply are discarded when they land.
enum Completion {
    Hydrated(OpenTicket, Result<Hydration, FetchError>),
    Groups(Result<Vec<GroupSummary>, FetchError>),
    Created(Result<GroupId, FetchError>),
}

/// Caller side of a running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    max_message_chars: usize,
}

impl SessionHandle {
    pub fn open(&self, channel: ChannelRef) -> Result<(), SessionError> {
        self.command(SessionCommand::Open(channel))
    }

    /// Validate and enqueue a message. Length and emptiness errors are
    /// reported here, before anything reaches the driver.
    pub fn send_message(&self, text: &str) -> Result<(), SessionError> {
        validate_outgoing(text, self.max_message_chars)?;
        self.command(SessionCommand::Send(text.to_string()))
    }

    pub fn notify_typing(&self, text: &str) -> Result<(), SessionError> {
        self.command(SessionCommand::Typing(text.to_string()))
    }

    pub fn refresh_groups(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::RefreshGroups)
    }

    pub fn create_group(&self, name: &str, member_ids: Vec<UserId>) -> Result<(), SessionError> {
        self.command(SessionCommand::CreateGroup {
            name: name.to_string(),
            member_ids,
        })
    }

    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Shutdown)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::DriverClosed)
    }
}

pub struct SessionDriver<A, T> {
    session: ChatSession<T>,
    api: Arc<A>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    events_open: bool,
    snapshots: watch::Sender<SessionSnapshot>,
    inflight: FuturesUnordered<BoxFuture<'static, Completion>>,
}

impl<A: ChatApi, T: Transport> SessionDriver<A, T> {
    pub fn new(
        session: ChatSession<T>,
        api: A,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(session.snapshot());

        let handle = SessionHandle {
            commands: commands_tx,
            snapshots: snapshot_rx,
            max_message_chars: session.config().max_message_chars,
        };

        let driver = Self {
            session,
            api: Arc::new(api),
            commands,
            events,
            events_open: true,
            snapshots,
            inflight: FuturesUnordered::new(),
        };

        (driver, handle)
    }

    /// Run until [`SessionCommand::Shutdown`] or until every handle is dropped.
    pub async fn run(mut self) {
        info!(viewer = %self.session.viewer().id, "Session driver started");

        loop {
            let deadline = self.session.next_deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => self.session.handle_transport(event),
                    None => {
                        warn!("Transport event stream closed");
                        self.events_open = false;
                    }
                },
                Some(completion) = self.inflight.next(), if !self.inflight.is_empty() => {
                    self.complete(completion);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.session.fire_timers(Instant::now());
                }
            }

            self.snapshots.send_replace(self.session.snapshot());
        }

        info!(
            abandoned = self.inflight.len(),
            "Session driver stopped"
        );
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Open(channel) => self.open(channel),
            SessionCommand::Send(text) => match self.session.send_message(&text) {
                Ok(SendOutcome::Sent) => {}
                Ok(SendOutcome::Offline) => debug!("Message dropped: gateway offline"),
                Err(e) => warn!("Message rejected: {}", e),
            },
            SessionCommand::Typing(text) => self.session.notify_typing(&text),
            SessionCommand::RefreshGroups => self.refresh_groups(),
            SessionCommand::CreateGroup { name, member_ids } => {
                let api = self.api.clone();
                self.inflight.push(
                    async move { Completion::Created(api.create_group(&name, &member_ids).await) }
                        .boxed(),
                );
            }
            // Intercepted by the run loop
            SessionCommand::Shutdown => {}
        }
    }

    fn open(&mut self, channel: ChannelRef) {
        let ticket = self.session.open(channel);
        let api = self.api.clone();
        self.inflight.push(
            async move {
                let result = hydrate(&*api, &ticket.channel).await;
                Completion::Hydrated(ticket, result)
            }
            .boxed(),
        );
    }

    fn refresh_groups(&mut self) {
        let api = self.api.clone();
        self.inflight
            .push(async move { Completion::Groups(api.groups().await) }.boxed());
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Hydrated(ticket, result) => {
                self.session.apply_hydration(&ticket, result);
            }
            Completion::Groups(result) => self.session.apply_groups(result),
            Completion::Created(Ok(group_id)) => {
                info!(group = %group_id, "Group created");
                self.refresh_groups();
                self.open(ChannelRef::Group { group_id });
            }
            Completion::Created(Err(e)) => self.session.record_group_error(e),
        }
    }
}
