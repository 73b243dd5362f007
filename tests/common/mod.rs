//! Test Fixtures
//!
//! Recorded gpg dialogues for transcript replay. Each script is what a
//! compliant gpg prints for one workflow, with its prompts in order.

#![allow(dead_code)]

use autocard::pty::{ReplayLauncher, Script};
use autocard::{Config, Provisioner};

pub const KEY_ID: &str = "ABCDEF1234567890";

/// Configuration with short timeouts so failing replays end quickly
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.session.timeout_secs = 1;
    config.session.keygen_timeout_secs = 1;
    config
}

pub fn provisioner(scripts: Vec<Script>) -> Provisioner<ReplayLauncher> {
    Provisioner::new(ReplayLauncher::new(scripts), test_config())
}

/// `--full-gen-key` up to `KEY_CREATED B <key_id>`
pub fn keygen_script(key_id: &str) -> Script {
    keygen_until_passphrase()
        .line("We need to generate a lot of random bytes.")
        .status("PROGRESS primegen + 0 0")
        .status(&format!("KEY_CONSIDERED 0123456789ABCDEF0123456789{} 0", key_id))
        .line(&format!("gpg: key {} marked as ultimately trusted", key_id))
        .key_created("B", key_id)
        .line("public and secret key created and signed.")
}

/// `--full-gen-key` through both passphrase prompts, without key creation
pub fn keygen_until_passphrase() -> Script {
    keygen_menu()
        .line_prompt("keygen.algo")
        .line("RSA keys may be between 1024 and 4096 bits long.")
        .line_prompt("keygen.size")
        .line("Requested keysize is 4096 bits")
        .line_prompt("keygen.valid")
        .line("Key does not expire at all")
        .line_prompt("keygen.name")
        .line_prompt("keygen.email")
        .line_prompt("keygen.comment")
        .line("You selected this USER-ID:")
        .line("    \"Jane Doe <jane@example.com>\"")
        .hidden_prompt("passphrase.enter")
        .hidden_prompt("passphrase.enter")
}

pub fn keygen_menu() -> Script {
    Script::new()
        .line("gpg (GnuPG) 2.2.40; Copyright (C) 2022 g10 Code GmbH")
        .line("Please select what kind of key you want:")
        .line("   (1) RSA and RSA (default)")
        .line("   (2) DSA and Elgamal")
        .line("   (3) DSA (sign only)")
        .line("   (4) RSA (sign only)")
}

fn subkey_line(script: Script, id: &str, selected: bool, usage: &str) -> Script {
    let marker = if selected { "ssb*" } else { "ssb " };
    script
        .line(&format!("{} rsa4096/{}", marker, id))
        .line(&format!(
            "     created: 2024-01-01  expires: never       usage: {:<4}",
            usage
        ))
}

/// Secret key listing; `selected` marks the encryption and auth subkeys
pub fn secret_listing(script: Script, selected: [bool; 2]) -> Script {
    let script = script
        .line("sec  rsa4096/ABCDEF1234567890")
        .line("     created: 2024-01-01  expires: never       usage: SC  ")
        .line("     trust: ultimate      validity: ultimate");
    let script = subkey_line(script, "1111222233334444", selected[0], "E");
    let script = subkey_line(script, "5555666677778888", selected[1], "A");
    script.line("[ultimate] (1). Jane Doe <jane@example.com>").line("")
}

/// `--expert --edit-key` adding the authentication subkey
pub fn auth_subkey_script() -> Script {
    Script::new()
        .line("Secret key is available.")
        .line("sec  rsa4096/ABCDEF1234567890")
        .line("     created: 2024-01-01  expires: never       usage: SC  ")
        .line("ssb  rsa4096/1111222233334444")
        .line("     created: 2024-01-01  expires: never       usage: E   ")
        .line_prompt("keyedit.prompt")
        .line("Please select what kind of key you want:")
        .line("   (3) DSA (sign only)")
        .line("   (4) RSA (sign only)")
        .line("   (8) RSA (set your own capabilities)")
        .line_prompt("keygen.algo")
        .line("Possible actions for a RSA key: Sign Encrypt Authenticate ")
        .line("Current allowed actions: Sign Encrypt ")
        .line_prompt("keygen.flags")
        .line("Current allowed actions: Sign Encrypt Authenticate ")
        .line_prompt("keygen.flags")
        .line("Current allowed actions: Encrypt Authenticate ")
        .line_prompt("keygen.flags")
        .line("Current allowed actions: Authenticate ")
        .line_prompt("keygen.flags")
        .line("RSA keys may be between 1024 and 4096 bits long.")
        .line_prompt("keygen.size")
        .line_prompt("keygen.valid")
        .hidden_prompt("passphrase.enter")
        .line("We need to generate a lot of random bytes.")
        .line("sec  rsa4096/ABCDEF1234567890")
        .line("     created: 2024-01-01  expires: never       usage: SC  ")
        .line("ssb  rsa4096/1111222233334444")
        .line("     created: 2024-01-01  expires: never       usage: E   ")
        .line("ssb  rsa4096/5555666677778888")
        .line("     created: 2024-01-01  expires: never       usage: A   ")
        .line_prompt("keyedit.prompt")
        .bool_prompt("keyedit.save.okay")
}

/// `--edit-key` listing after `toggle`, with subkey usages in `usages` order
pub fn keytocard_script_with_usages(usages: [&str; 3]) -> Script {
    let script = Script::new()
        .line("Secret key is available.")
        .line("pub  rsa4096/ABCDEF1234567890")
        .line_prompt("keyedit.prompt")
        .line("sec  rsa4096/ABCDEF1234567890")
        .line(&format!(
            "     created: 2024-01-01  expires: never       usage: {:<4}",
            usages[0]
        ));
    let script = subkey_line(script, "1111222233334444", false, usages[1]);
    let script = subkey_line(script, "5555666677778888", false, usages[2]);

    let script = script
        .line_prompt("keyedit.prompt")
        .bool_prompt("keyedit.keytocard.use_primary")
        .line("Please select where to store the key:")
        .line("   (1) Signature key")
        .line("   (3) Authentication key")
        .line_prompt("cardedit.genkeys.storekeytype")
        .hidden_prompt("passphrase.enter")
        .hidden_prompt("passphrase.enter");
    let script = secret_listing(script, [false, false]);

    // key 1
    let script = script.line_prompt("keyedit.prompt");
    let script = secret_listing(script, [true, false]);
    let script = script
        .line_prompt("keyedit.prompt")
        .line("Please select where to store the key:")
        .line("   (2) Encryption key")
        .line_prompt("cardedit.genkeys.storekeytype")
        .hidden_prompt("passphrase.enter");
    let script = secret_listing(script, [true, false]);

    // key 2, then key 1
    let script = script.line_prompt("keyedit.prompt");
    let script = secret_listing(script, [true, true]);
    let script = script.line_prompt("keyedit.prompt");
    let script = secret_listing(script, [false, true]);
    let script = script
        .line_prompt("keyedit.prompt")
        .line("Please select where to store the key:")
        .line("   (3) Authentication key")
        .line_prompt("cardedit.genkeys.storekeytype")
        .hidden_prompt("passphrase.enter");
    let script = secret_listing(script, [false, true]);

    script
        .line_prompt("keyedit.prompt")
        .bool_prompt("keyedit.save.okay")
}

/// `--edit-key` moving all three keys onto the card
pub fn keytocard_script() -> Script {
    keytocard_script_with_usages(["SC", "E", "A"])
}

fn card_status(script: Script) -> Script {
    script
        .line("Reader ...........: Yubico YubiKey OTP FIDO CCID 00 00")
        .line("Application ID ...: D2760001240103040006123456780000")
        .line("Version ..........: 3.4")
        .line("")
}

/// `--card-edit` changing the user PIN; `confirmed` controls `PIN changed.`
pub fn user_pin_script_with(confirmed: bool) -> Script {
    let script = card_status(Script::new())
        .line_prompt("cardedit.prompt")
        .hidden_prompt("passphrase.enter")
        .hidden_prompt("passphrase.enter")
        .hidden_prompt("passphrase.enter");
    let script = if confirmed {
        script.line("PIN changed.")
    } else {
        script
    };
    script.line_prompt("cardedit.prompt")
}

pub fn user_pin_script() -> Script {
    user_pin_script_with(true)
}

/// `--card-edit` changing the admin PIN
pub fn admin_pin_script() -> Script {
    let script = card_status(Script::new())
        .line_prompt("cardedit.prompt")
        .line("Admin commands are allowed")
        .line("")
        .line_prompt("cardedit.prompt");
    let script = pin_menu(script)
        .line_prompt("cardutil.change_pin.menu")
        .hidden_prompt("passphrase.enter")
        .hidden_prompt("passphrase.enter")
        .hidden_prompt("passphrase.enter")
        .line("PIN changed.");
    pin_menu(script)
        .line_prompt("cardutil.change_pin.menu")
        .line_prompt("cardedit.prompt")
}

fn pin_menu(script: Script) -> Script {
    script
        .line("1 - change PIN")
        .line("2 - unblock PIN")
        .line("3 - change Admin PIN")
        .line("4 - set the Reset Code")
        .line("Q - quit")
        .line("")
}
