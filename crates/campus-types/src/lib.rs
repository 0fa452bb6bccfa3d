pub mod api;
pub mod events;
pub mod ids;
pub mod models;

pub use ids::{GroupId, MessageId, UserId};
pub use models::{ChannelRef, GroupSummary, LastMessagePreview, Member, Message, Role, Sender, Viewer};
