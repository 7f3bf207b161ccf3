use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::SessionId;

// ============================================================================
// Auth Provider - supplies the opaque session identity
// ============================================================================
//
// The cart engine never authenticates anyone; it only receives the
// SessionId an AuthProvider hands out.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub session_id: SessionId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Password cannot be empty")]
    EmptyPassword,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
    fn signup(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}

/// Accepts any well-formed credentials and answers with a canned profile
#[derive(Debug, Default)]
pub struct MockAuthProvider;

impl MockAuthProvider {
    fn validate(credentials: &Credentials) -> Result<(), AuthError> {
        let email = credentials.email.trim();
        if email.is_empty() {
            return Err(AuthError::EmptyEmail);
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail(email.to_string()));
        }
        if credentials.password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        Ok(())
    }

    fn identity(name: &str, credentials: &Credentials) -> Identity {
        Identity {
            session_id: SessionId::new(Uuid::new_v4().to_string()),
            name: name.to_string(),
            email: credentials.email.trim().to_string(),
        }
    }
}

impl AuthProvider for MockAuthProvider {
    fn login(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        Self::validate(credentials)?;
        Ok(Self::identity("John Doe", credentials))
    }

    fn signup(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        Self::validate(credentials)?;
        Ok(Self::identity("Jane Smith", credentials))
    }
}
