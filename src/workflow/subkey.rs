//! Authentication subkey addition (`--expert --edit-key`)
//!
//! The expert menu offers an RSA key with self-chosen capabilities. Its
//! capability editor starts from `Sign Encrypt` and toggles one flag per
//! reply, so both the starting set and the result are checked exactly.

use super::{Step, Workflow};
use crate::error::Result;
use crate::models::{KeyId, Secret};

/// Expert menu entry "RSA (set your own capabilities)"
const ALGO_RSA_CUSTOM: &str = "8";

/// Add an authentication-only RSA subkey to `key_id`
pub fn add_auth_subkey(key_id: &KeyId, key_size: u32) -> Result<Workflow> {
    let steps = vec![
        Step::banner("Secret key is available."),
        Step::exchange("keyedit.prompt", "addkey"),
        Step::banner("(8) RSA (set your own capabilities)"),
        Step::exchange("keygen.algo", ALGO_RSA_CUSTOM),
        Step::line_tail("Current allowed actions: Sign Encrypt")?,
        // Toggle authenticate on, sign and encrypt off
        Step::exchange("keygen.flags", "a"),
        Step::exchange("keygen.flags", "s"),
        Step::exchange("keygen.flags", "e"),
        Step::line_tail("Current allowed actions: Authenticate")?,
        Step::exchange("keygen.flags", "q"),
        Step::exchange("keygen.size", key_size.to_string()),
        Step::exchange("keygen.valid", "0"),
        Step::exchange_secret("passphrase.enter", &Secret::empty()),
        Step::line_tail("usage: A")?.slow(),
        Step::exchange("keyedit.prompt", "quit"),
        Step::exchange("keyedit.save.okay", "y"),
        Step::AwaitExit,
    ];

    Ok(Workflow::new(
        "auth subkey addition",
        vec![
            "--expert".to_string(),
            "--edit-key".to_string(),
            key_id.to_string(),
        ],
        steps,
    ))
}
