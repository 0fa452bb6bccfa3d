//! Turns successive session snapshots into terminal lines.

use chrono::Local;
use tokio::sync::watch;

use campus_chat::{Phase, SessionSnapshot};
use campus_types::{ChannelRef, GroupSummary, Member, Message, UserId};

/// What has already been written for the open channel.
pub struct Renderer {
    viewer: UserId,
    epoch: u64,
    phase: Phase,
    printed: usize,
    typing: Vec<String>,
    connected: bool,
}

impl Renderer {
    pub fn new(viewer: UserId) -> Self {
        Self {
            viewer,
            epoch: 0,
            phase: Phase::Idle,
            printed: 0,
            typing: Vec::new(),
            connected: false,
        }
    }

    /// Lines to print for the transition to `snapshot`.
    pub fn update(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if snapshot.connected != self.connected {
            self.connected = snapshot.connected;
            lines.push(if self.connected {
                "* connected".to_string()
            } else {
                "* offline, reconnecting...".to_string()
            });
        }

        // Any open, same channel or not, replaces the timeline. The epoch
        // catches reopens even when the Loading snapshot was coalesced away.
        if snapshot.epoch != self.epoch {
            self.epoch = snapshot.epoch;
            self.phase = Phase::Idle;
            self.printed = 0;
            self.typing.clear();
        }

        if snapshot.phase != self.phase {
            self.phase = snapshot.phase.clone();
            match &self.phase {
                Phase::Loading => lines.push(format!("* loading {}...", title(snapshot))),
                Phase::Ready => lines.push(format!("== {} ==", title(snapshot))),
                Phase::Failed(e) => lines.push(format!("* could not load {}: {}", title(snapshot), e)),
                Phase::Idle => {}
            }
        }

        // Timelines only grow within one epoch
        if snapshot.messages.len() > self.printed {
            for message in &snapshot.messages[self.printed..] {
                lines.push(self.message_line(message));
            }
            self.printed = snapshot.messages.len();
        }

        if snapshot.typing != self.typing {
            self.typing = snapshot.typing.clone();
            if let Some(line) = typing_line(&self.typing) {
                lines.push(line);
            }
        }

        lines
    }

    fn message_line(&self, message: &Message) -> String {
        let author = if message.sender.id == self.viewer {
            "you"
        } else {
            message.sender.display_name.as_str()
        };
        format!(
            "[{}] {}: {}",
            message.created_at.with_timezone(&Local).format("%H:%M"),
            author,
            message.content
        )
    }
}

fn title(snapshot: &SessionSnapshot) -> String {
    match (&snapshot.channel, &snapshot.channel_name) {
        (Some(ChannelRef::Forum), _) => "department forum".to_string(),
        (Some(_), Some(name)) => name.clone(),
        (Some(ChannelRef::Group { group_id }), None) => format!("group {}", group_id),
        (None, _) => "nothing".to_string(),
    }
}

pub fn typing_line(names: &[String]) -> Option<String> {
    match names {
        [] => None,
        [one] => Some(format!("* {} is typing...", one)),
        [a, b] => Some(format!("* {} and {} are typing...", a, b)),
        many => Some(format!("* {} people are typing...", many.len())),
    }
}

pub fn group_lines(groups: &[GroupSummary]) -> Vec<String> {
    if groups.is_empty() {
        return vec!["* no groups yet".to_string()];
    }
    groups
        .iter()
        .map(|group| {
            let preview = group
                .last_message
                .as_ref()
                .map(|last| format!(" | {}", last.content))
                .unwrap_or_default();
            format!("  {}  {} ({} members){}", group.id, group.name, group.member_count, preview)
        })
        .collect()
}

pub fn roster_lines(roster: &[Member]) -> Vec<String> {
    roster
        .iter()
        .map(|member| format!("  {}  {} ({})", member.id, member.display_name(), String::from(member.role.clone())))
        .collect()
}

/// Print every snapshot change until the driver goes away.
pub async fn run(mut snapshots: watch::Receiver<SessionSnapshot>, viewer: UserId) {
    let mut renderer = Renderer::new(viewer);
    loop {
        let lines = renderer.update(&snapshots.borrow_and_update());
        for line in lines {
            println!("{}", line);
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use campus_types::{MessageId, Role, Sender};

    fn snapshot(epoch: u64, channel: ChannelRef, phase: Phase, messages: Vec<Message>) -> SessionSnapshot {
        SessionSnapshot {
            epoch,
            channel: Some(channel),
            channel_name: None,
            phase,
            messages,
            roster: Vec::new(),
            typing: Vec::new(),
            groups: Vec::new(),
            groups_error: None,
            connected: true,
            input: String::new(),
        }
    }

    fn message(id: &str, sender: &str, content: &str) -> Message {
        Message {
            id: MessageId::new(id),
            sender: Sender {
                id: UserId::new(sender),
                display_name: format!("Name {}", sender),
                avatar: None,
                role: Role::Student,
            },
            content: content.to_string(),
            channel: ChannelRef::Forum,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn prints_only_new_messages() {
        let mut renderer = Renderer::new(UserId::new("me"));
        let first = snapshot(1, ChannelRef::Forum, Phase::Ready, vec![message("m1", "u1", "hi")]);
        let lines = renderer.update(&first);
        assert_eq!(lines[0], "* connected");
        assert_eq!(lines[1], "== department forum ==");
        assert!(lines[2].ends_with("Name u1: hi"));

        let second = snapshot(
            1,
            ChannelRef::Forum,
            Phase::Ready,
            vec![message("m1", "u1", "hi"), message("m2", "me", "hello")],
        );
        let lines = renderer.update(&second);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("you: hello"));
    }

    #[test]
    fn switching_channel_starts_over() {
        let mut renderer = Renderer::new(UserId::new("me"));
        renderer.update(&snapshot(1, ChannelRef::Forum, Phase::Ready, vec![message("m1", "u1", "hi")]));

        let lines = renderer.update(&snapshot(2, ChannelRef::group("g1"), Phase::Loading, vec![]));
        assert_eq!(lines, ["* loading group g1..."]);
    }

    #[test]
    fn reopening_the_same_channel_prints_from_the_start() {
        let mut renderer = Renderer::new(UserId::new("me"));
        renderer.update(&snapshot(
            1,
            ChannelRef::Forum,
            Phase::Ready,
            vec![message("h1", "u1", "one"), message("h2", "u1", "two"), message("h3", "u1", "three")],
        ));

        // Retry failed; the Loading snapshot in between was never observed
        let failed = Phase::Failed(campus_chat::FetchError::Status { status: 502 });
        let lines = renderer.update(&snapshot(2, ChannelRef::Forum, failed, vec![message("p1", "u2", "still here")]));

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "* could not load department forum: server returned status 502");
        assert!(lines[1].ends_with("Name u2: still here"));
    }

    #[test]
    fn peers_typing_is_shown_once_per_change() {
        let mut renderer = Renderer::new(UserId::new("me"));
        let mut typing = snapshot(1, ChannelRef::Forum, Phase::Ready, vec![]);
        renderer.update(&typing);

        typing.typing = vec!["Ada".into()];
        assert_eq!(renderer.update(&typing), ["* Ada is typing..."]);
        assert!(renderer.update(&typing).is_empty());
    }

    #[test]
    fn typing_line_collapses_crowds() {
        assert_eq!(typing_line(&[]), None);
        assert_eq!(typing_line(&["Ada".into()]).unwrap(), "* Ada is typing...");
        assert_eq!(
            typing_line(&["Ada".into(), "Ben".into()]).unwrap(),
            "* Ada and Ben are typing..."
        );
        assert_eq!(
            typing_line(&["A".into(), "B".into(), "C".into()]).unwrap(),
            "* 3 people are typing..."
        );
    }
}
