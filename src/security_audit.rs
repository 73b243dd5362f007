//! Security Audit Logging
//!
//! Card provisioning events, logged separately from the dialogue trace.
//!
//! ## Security Policy
//!
//! - **NEVER** log PINs, passphrases, or any reply sent as a secret
//! - Only log key identifiers, operation names and outcome metadata
//! - Use INFO level for normal events, WARN for failures
//!
//! ## Events Logged
//!
//! - Peer session start (operation only)
//! - Key generation, subkey addition and transfer to card (key id only)
//! - PIN changes (which PIN, never its value)
//! - Assumption guard failures and other aborted workflows
//! - Configuration loads/errors

use tracing::{info, warn};

use crate::models::KeyId;

/// Security audit event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    /// A peer session started
    SessionStart,
    /// A new key pair was generated
    KeyGenerated,
    /// An authentication subkey was added
    SubkeyAdded,
    /// Keys were moved onto the card
    KeysMovedToCard,
    /// The user PIN was changed
    UserPinChanged,
    /// The admin PIN was changed
    AdminPinChanged,
    /// The peer's layout did not match what the workflow assumes
    GuardFailed,
    /// A workflow aborted for another reason
    WorkflowAborted,
    /// Configuration file loaded
    ConfigLoaded,
    /// Configuration file error
    ConfigError,
}

impl SecurityEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> &'static str {
        match self {
            SecurityEvent::SessionStart => "Peer session started",
            SecurityEvent::KeyGenerated => "Key pair generated",
            SecurityEvent::SubkeyAdded => "Authentication subkey added",
            SecurityEvent::KeysMovedToCard => "Keys moved to card",
            SecurityEvent::UserPinChanged => "User PIN changed",
            SecurityEvent::AdminPinChanged => "Admin PIN changed",
            SecurityEvent::GuardFailed => "Assumption guard failed",
            SecurityEvent::WorkflowAborted => "Workflow aborted",
            SecurityEvent::ConfigLoaded => "Configuration loaded successfully",
            SecurityEvent::ConfigError => "Configuration loading error",
        }
    }

    /// Whether this event reports a failure and should be logged as a warning
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SecurityEvent::GuardFailed | SecurityEvent::WorkflowAborted | SecurityEvent::ConfigError
        )
    }
}

/// Log a security audit event
///
/// ## Security Note
///
/// Never pass secret values as metadata. Only include non-sensitive
/// information like key ids, operation names and exit codes.
///
/// # Examples
///
/// ```
/// use autocard::security_audit::{log_security_event, SecurityEvent};
///
/// // Good: Logs event with non-sensitive metadata
/// log_security_event(SecurityEvent::KeyGenerated, Some("key=ABCDEF1234567890"));
///
/// // BAD: Never do this!
/// // log_security_event(SecurityEvent::UserPinChanged, Some("pin=123456"));
/// ```
pub fn log_security_event(event: SecurityEvent, metadata: Option<&str>) {
    let event_desc = event.description();

    let log_message = if let Some(meta) = metadata {
        format!("SECURITY AUDIT: {} | {}", event_desc, meta)
    } else {
        format!("SECURITY AUDIT: {}", event_desc)
    };

    if event.is_failure() {
        warn!("{}", log_message);
    } else {
        info!("{}", log_message);
    }
}

/// Log the start of a peer session (operation arguments only)
pub fn log_session_start(workflow: &str, operation: &[String]) {
    log_security_event(
        SecurityEvent::SessionStart,
        Some(&format!(
            "workflow={} args={}",
            workflow,
            sanitize(&operation.join(" "))
        )),
    );
}

/// Log a completed key operation
pub fn log_key_event(event: SecurityEvent, key_id: &KeyId) {
    log_security_event(event, Some(&format!("key={}", sanitize(key_id.as_str()))));
}

/// Log a completed PIN change (which PIN only)
pub fn log_pin_changed(admin: bool) {
    let event = if admin {
        SecurityEvent::AdminPinChanged
    } else {
        SecurityEvent::UserPinChanged
    };
    log_security_event(event, None);
}

/// Log an aborted workflow with the step it stopped at
pub fn log_workflow_failure(guard: bool, workflow: &str, position: &str) {
    let event = if guard {
        SecurityEvent::GuardFailed
    } else {
        SecurityEvent::WorkflowAborted
    };
    log_security_event(
        event,
        Some(&format!("workflow={} step={}", workflow, sanitize(position))),
    );
}

/// Log configuration events
pub fn log_config_event(is_error: bool, details: Option<&str>) {
    let event = if is_error {
        SecurityEvent::ConfigError
    } else {
        SecurityEvent::ConfigLoaded
    };
    log_security_event(event, details);
}

/// Strip characters that could forge log lines
fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}
