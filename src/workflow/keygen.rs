//! Primary key generation (`--full-gen-key`)

use super::{Step, Workflow};
use crate::credentials::Identity;
use crate::models::Secret;

/// Algorithm menu entry for an RSA primary key with an RSA subkey
const ALGO_RSA_AND_RSA: &str = "1";

/// Generate an RSA primary key with an encryption subkey for `identity`
///
/// The key never expires and carries no passphrase; it is moved onto the
/// card afterwards. The outcome's key id is taken from `KEY_CREATED B`.
pub fn key_generation(identity: &Identity, key_size: u32) -> Workflow {
    let steps = vec![
        Step::banner("(1) RSA and RSA (default)"),
        Step::exchange("keygen.algo", ALGO_RSA_AND_RSA),
        Step::exchange("keygen.size", key_size.to_string()),
        Step::exchange("keygen.valid", "0"),
        Step::exchange("keygen.name", identity.name.as_str()),
        Step::exchange("keygen.email", identity.email.as_str()),
        Step::exchange("keygen.comment", identity.comment.as_str()),
        Step::exchange_secret("passphrase.enter", &Secret::empty()),
        Step::exchange_secret("passphrase.enter", &Secret::empty()),
        Step::capture_key_created("B"),
        Step::AwaitExit,
    ];

    Workflow::new("key generation", vec!["--full-gen-key".to_string()], steps)
}
