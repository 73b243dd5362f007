//! Credential Material
//!
//! Identity fields for the generated key and PIN values for the card. The
//! random PIN generator sits behind [`PinSource`] so callers and tests can
//! substitute their own.

use rand::Rng;
use thiserror::Error;

use crate::models::Secret;

/// Longest PIN an OpenPGP card accepts
pub const MAX_PIN_LENGTH: usize = 127;

/// Shortest user PIN an OpenPGP card accepts
pub const MIN_USER_PIN_LENGTH: usize = 6;

/// Shortest admin PIN an OpenPGP card accepts
pub const MIN_ADMIN_PIN_LENGTH: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("{role} PIN must be at least {min} characters")]
    TooShort { role: PinRole, min: usize },

    #[error("{role} PIN must be at most {max} characters", max = MAX_PIN_LENGTH)]
    TooLong { role: PinRole },

    #[error("{role} PIN must contain only digits")]
    NotNumeric { role: PinRole },

    #[error("{field} cannot be empty")]
    MissingIdentity { field: &'static str },

    #[error("{field} cannot contain line breaks")]
    MultiLineIdentity { field: &'static str },

    #[error("no PIN left for a {requested}-digit request")]
    PinSourceExhausted { requested: usize },

    #[error("next PIN has {actual} digits, {requested} were requested")]
    PinLengthMismatch { requested: usize, actual: usize },
}

/// Which card PIN a value is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    User,
    Admin,
}

impl PinRole {
    pub fn min_length(&self) -> usize {
        match self {
            PinRole::User => MIN_USER_PIN_LENGTH,
            PinRole::Admin => MIN_ADMIN_PIN_LENGTH,
        }
    }
}

impl std::fmt::Display for PinRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinRole::User => f.write_str("User"),
            PinRole::Admin => f.write_str("Admin"),
        }
    }
}

/// Check a PIN before it is sent to the card
pub fn validate_pin(pin: &Secret, role: PinRole) -> Result<(), CredentialError> {
    if pin.len() < role.min_length() {
        return Err(CredentialError::TooShort {
            role,
            min: role.min_length(),
        });
    }
    if pin.len() > MAX_PIN_LENGTH {
        return Err(CredentialError::TooLong { role });
    }
    if !pin.expose().bytes().all(|b| b.is_ascii_digit()) {
        return Err(CredentialError::NotNumeric { role });
    }
    Ok(())
}

/// Owner identity written into the key's user ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub comment: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, CredentialError> {
        let identity = Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            comment: String::new(),
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Join multi-word name arguments the way a shell splits them
    pub fn from_parts(name_parts: &[String], email: impl Into<String>) -> Result<Self, CredentialError> {
        Self::new(name_parts.join(" "), email)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Result<Self, CredentialError> {
        self.comment = comment.into();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), CredentialError> {
        if self.name.is_empty() {
            return Err(CredentialError::MissingIdentity { field: "Name" });
        }
        if self.email.is_empty() {
            return Err(CredentialError::MissingIdentity { field: "Email" });
        }
        // Every reply is one line on the command descriptor
        for (field, value) in [
            ("Name", &self.name),
            ("Email", &self.email),
            ("Comment", &self.comment),
        ] {
            if value.contains(['\n', '\r']) {
                return Err(CredentialError::MultiLineIdentity { field });
            }
        }
        Ok(())
    }
}

/// Source of fresh PIN values
pub trait PinSource {
    /// A string of exactly `count` decimal digits
    fn random_digits(&mut self, count: usize) -> Result<Secret, CredentialError>;
}

/// Uniform random digits from the thread-local CSPRNG
#[derive(Debug, Default)]
pub struct RandomPinSource;

impl PinSource for RandomPinSource {
    fn random_digits(&mut self, count: usize) -> Result<Secret, CredentialError> {
        let mut rng = rand::rng();
        let digits: String = (0..count)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        Ok(Secret::new(digits))
    }
}

/// Hands out predetermined PINs in order; for tests and scripted runs
#[derive(Debug, Default)]
pub struct FixedPinSource {
    pins: std::collections::VecDeque<String>,
}

impl FixedPinSource {
    pub fn new<I, S>(pins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pins: pins.into_iter().map(Into::into).collect(),
        }
    }
}

impl PinSource for FixedPinSource {
    fn random_digits(&mut self, count: usize) -> Result<Secret, CredentialError> {
        match self.pins.pop_front() {
            Some(pin) if pin.len() == count => Ok(Secret::new(pin)),
            Some(pin) => Err(CredentialError::PinLengthMismatch {
                requested: count,
                actual: pin.len(),
            }),
            None => Err(CredentialError::PinSourceExhausted { requested: count }),
        }
    }
}
