//! Canonical identity types.
//!
//! The backend is not consistent about how it spells an identity: cached
//! session payloads carry `_id`, gateway pushes carry `id`, some rosters embed
//! the whole user document and a few legacy endpoints send numbers. Every
//! identity crosses into this crate through [`RawId`], which collapses those
//! shapes into one trimmed string. Comparisons only ever happen between the
//! canonical newtypes below.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Every identity shape the backend is known to send.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
    Embedded {
        #[serde(alias = "_id")]
        id: Box<RawId>,
    },
}

impl RawId {
    fn into_canonical(self) -> String {
        match self {
            RawId::Text(text) => text.trim().to_string(),
            RawId::Number(number) => number.to_string(),
            RawId::Embedded { id } => id.into_canonical(),
        }
    }
}

macro_rules! canonical_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl AsRef<str>) -> Self {
                Self(raw.as_ref().trim().to_string())
            }

            /// Normalize an arbitrary JSON value. Returns `None` for shapes
            /// that carry no identity at all (null, arrays, objects without id).
            pub fn from_value(value: &serde_json::Value) -> Option<Self> {
                RawId::deserialize(value)
                    .ok()
                    .map(|raw| Self(raw.into_canonical()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_canonical()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::new(raw)
            }
        }
    };
}

canonical_id!(
    /// Identity of a portal user (student, faculty, counselor, staff or admin).
    UserId
);

canonical_id!(
    /// Identity of an ad hoc chat group.
    GroupId
);

canonical_id!(
    /// Server-assigned message id, stable for the lifetime of the message.
    MessageId
);
