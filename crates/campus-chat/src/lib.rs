//! Realtime messaging session for the campus portal.
//!
//! [`session::ChatSession`] is the synchronous state machine for one active
//! channel. [`driver::SessionDriver`] runs it on a single task, feeding it
//! caller commands, gateway events, fetch completions and timer expiries.

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod session;
pub mod timeline;
pub mod transport;
pub mod typing;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SessionConfig;
pub use driver::{SessionCommand, SessionDriver, SessionHandle};
pub use error::{FetchError, SessionError};
pub use session::{ChatSession, OpenTicket, Phase, SendOutcome, SessionSnapshot};
pub use transport::{Transport, TransportEvent};
