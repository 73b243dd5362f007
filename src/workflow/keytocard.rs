//! Moving keys onto the card (`--edit-key`, `keytocard`)
//!
//! The three keys go to the card's three slots: the primary key to the
//! signature slot, the first subkey to encryption and the second to
//! authentication. Subkeys are addressed by position, so the usage listing
//! is checked first and the selection markers are checked before each move.

use super::{Step, Workflow};
use crate::error::Result;
use crate::models::{KeyId, Secret};

/// Card slots, in the peer's `storekeytype` numbering
const SLOT_SIGNATURE: &str = "1";
const SLOT_ENCRYPTION: &str = "2";
const SLOT_AUTHENTICATION: &str = "3";

fn primary_line() -> Step {
    Step::line_start("sec", "sec")
}

fn selected_subkey() -> Step {
    Step::line_start("ssb*", "ssb* (selected)")
}

fn unselected_subkey() -> Step {
    Step::line_start("ssb ", "ssb (not selected)")
}

/// Move the primary key and both subkeys of `key_id` onto the card
pub fn transfer_to_card(key_id: &KeyId, admin_pin: &Secret) -> Result<Workflow> {
    let steps = vec![
        // Switch the listing to secret keys
        Step::exchange("keyedit.prompt", "toggle"),
        Step::line_tail("usage: SC")?,
        Step::line_tail("usage: E")?,
        Step::line_tail("usage: A")?,
        // Primary key
        Step::exchange("keyedit.prompt", "keytocard"),
        Step::exchange("keyedit.keytocard.use_primary", "y"),
        Step::banner("(1) Signature key"),
        Step::exchange("cardedit.genkeys.storekeytype", SLOT_SIGNATURE),
        Step::exchange_secret("passphrase.enter", admin_pin),
        Step::exchange_secret("passphrase.enter", admin_pin),
        // Encryption subkey
        Step::exchange("keyedit.prompt", "key 1"),
        primary_line(),
        selected_subkey(),
        unselected_subkey(),
        Step::exchange("keyedit.prompt", "keytocard"),
        Step::banner("(2) Encryption key"),
        Step::exchange("cardedit.genkeys.storekeytype", SLOT_ENCRYPTION),
        Step::exchange_secret("passphrase.enter", admin_pin),
        // Authentication subkey
        Step::exchange("keyedit.prompt", "key 2"),
        Step::exchange("keyedit.prompt", "key 1"),
        primary_line(),
        unselected_subkey(),
        selected_subkey(),
        Step::exchange("keyedit.prompt", "keytocard"),
        Step::banner("(3) Authentication key"),
        Step::exchange("cardedit.genkeys.storekeytype", SLOT_AUTHENTICATION),
        Step::exchange_secret("passphrase.enter", admin_pin),
        Step::exchange("keyedit.prompt", "quit"),
        Step::exchange("keyedit.save.okay", "y"),
        Step::AwaitExit,
    ];

    Ok(Workflow::new(
        "transfer to card",
        vec!["--edit-key".to_string(), key_id.to_string()],
        steps,
    ))
}
