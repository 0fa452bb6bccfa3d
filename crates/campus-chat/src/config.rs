use std::time::Duration;

use campus_types::models::MAX_MESSAGE_CHARS;

/// Remote typing indicators expire after this much silence.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(3);

/// The local stop signal fires this long after the last keystroke. Kept
/// shorter than [`TYPING_EXPIRY`] so peers normally see an explicit stop.
pub const TYPING_DEBOUNCE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub typing_expiry: Duration,
    pub typing_debounce: Duration,
    pub max_message_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_expiry: TYPING_EXPIRY,
            typing_debounce: TYPING_DEBOUNCE,
            max_message_chars: MAX_MESSAGE_CHARS,
        }
    }
}
