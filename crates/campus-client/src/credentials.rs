//! Remember-me persistence.
//!
//! The token and viewer profile are written as one JSON document when the
//! user logs in and read back once at startup. Nothing else touches the file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use campus_types::Viewer;
use campus_types::api::Claims;

use crate::error::CredentialError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub viewer: Viewer,
    pub saved_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn new(token: impl Into<String>, viewer: Viewer) -> Self {
        Self {
            token: token.into(),
            viewer,
            saved_at: Utc::now(),
        }
    }

    /// Expiry read from the token's `exp` claim. The signature is not
    /// checked; the backend does that on every request.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(&self.token, &DecodingKey::from_secret(&[]), &validation).ok()?;
        DateTime::from_timestamp(data.claims.exp?, 0)
    }

    /// Opaque tokens and tokens without `exp` never count as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved credentials. A missing file yields `None`; an expired token
    /// is deleted and also yields `None`.
    pub async fn load(&self) -> Result<Option<StoredCredentials>, CredentialError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredCredentials = serde_json::from_slice(&raw)?;

        if stored.is_expired(Utc::now()) {
            info!(user = %stored.viewer.id, "Saved session expired");
            self.clear().await?;
            return Ok(None);
        }

        debug!(user = %stored.viewer.id, path = %self.path.display(), "Loaded saved session");
        Ok(Some(stored))
    }

    pub async fn save(&self, credentials: &StoredCredentials) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(credentials)?;
        fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    /// Forget saved credentials. Succeeds if there were none.
    pub async fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
