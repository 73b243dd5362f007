//! Dialogue Driver
//!
//! One prompt/reply round trip: wait for the peer to ask for a field, answer
//! it, and wait for the acknowledgement. The peer being the one to ask is
//! what keeps every reply in step with the dialogue.

use crate::error::Result;
use crate::models::Secret;
use crate::protocol::PromptKind;
use crate::session::Session;

/// A reply to one prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Sent and logged as is
    Text(String),
    /// Sent as is, never logged or recorded
    Secret(Secret),
}

impl Reply {
    pub fn text(value: impl Into<String>) -> Self {
        Reply::Text(value.into())
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Reply::Secret(_))
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Text(text) => write!(f, "'{}'", text),
            Reply::Secret(secret) => write!(f, "{}", secret),
        }
    }
}

impl From<Secret> for Reply {
    fn from(secret: Secret) -> Self {
        Reply::Secret(secret)
    }
}

/// Answer the peer's next prompt, which must be for `field`
///
/// # Errors
/// Fails with `AssumptionGuard` if the peer asks for another field or
/// moves on without acknowledging, `Timeout` or `EndOfStream` if it never
/// asks or never acknowledges, and `ChannelWrite` if it already exited. The
/// error carries `field`.
pub async fn exchange(session: &mut Session, field: &str, reply: &Reply) -> Result<PromptKind> {
    let result: Result<PromptKind> = async {
        let kind = session.expect_prompt(field).await?;
        match reply {
            Reply::Text(text) => session.send(text).await?,
            Reply::Secret(secret) => session.send_secret(secret).await?,
        }
        session.expect_ack().await?;
        Ok(kind)
    }
    .await;

    result.map_err(|e| e.in_exchange(field))
}
