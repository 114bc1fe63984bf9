//! Sign-in gate
//!
//! The workflow sits behind a login step. Authentication is a pluggable
//! capability: the front end only talks to [`Authenticator`]. The bundled
//! [`SimulatedAuthenticator`] performs no real verification; it accepts any
//! non-blank identifier after a short delay.

use crate::config::AuthConfig;
use crate::error::{MedraxError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// What the user typed at the sign-in prompt
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Email address or mobile number
    pub id: String,
    /// Password, if one was entered
    pub password: Option<String>,
}

impl Credentials {
    /// Credentials with an identifier only
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            password: None,
        }
    }
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identifier the user signed in with
    pub id: String,
    /// Opaque token for this sign-in
    pub token: Uuid,
    /// When the sign-in completed
    pub signed_in_at: DateTime<Utc>,
}

/// Verifies credentials and issues an identity
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Attempt to sign in
    ///
    /// # Errors
    ///
    /// Returns `MedraxError::Authentication` when the credentials are rejected
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity>;
}

/// Placeholder authenticator: any non-blank identifier is accepted
#[derive(Debug, Clone)]
pub struct SimulatedAuthenticator {
    delay: Duration,
}

impl SimulatedAuthenticator {
    /// Create an authenticator that waits `delay` before accepting
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl From<&AuthConfig> for SimulatedAuthenticator {
    fn from(config: &AuthConfig) -> Self {
        Self::new(Duration::from_millis(config.simulated_delay_ms))
    }
}

#[async_trait]
impl Authenticator for SimulatedAuthenticator {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity> {
        let id = credentials.id.trim();
        if id.is_empty() {
            return Err(MedraxError::Authentication(
                "Enter your email or mobile number".to_string(),
            )
            .into());
        }

        tracing::debug!("Simulated sign-in for {}", id);
        tokio::time::sleep(self.delay).await;

        let identity = Identity {
            id: id.to_string(),
            token: Uuid::new_v4(),
            signed_in_at: Utc::now(),
        };
        tracing::info!("Signed in as {}", identity.id);
        Ok(identity)
    }
}
