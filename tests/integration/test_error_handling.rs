//! Integration Tests for Desynchronization Handling
//!
//! A replayed dialogue that differs from what a workflow assumes must stop
//! the workflow with a classified error, before any reply that depends on
//! the broken assumption is sent.

#[path = "../common/mod.rs"]
mod common;

use autocard::credentials::FixedPinSource;
use autocard::pty::{ReplayLauncher, Script};
use autocard::{Error, ErrorKind, Identity, KeyId, Provisioner, Secret};
use common::*;

fn jane() -> Identity {
    Identity::new("Jane Doe", "jane@example.com").unwrap()
}

fn step_of(err: &Error) -> (&'static str, usize, String) {
    match err {
        Error::Step {
            workflow,
            index,
            position,
            ..
        } => (*workflow, *index, position.clone()),
        other => panic!("error carries no workflow position: {:?}", other),
    }
}

#[tokio::test]
async fn test_pin_change_without_confirmation_times_out() {
    let provisioner = provisioner(vec![user_pin_script_with(false)]);

    let err = provisioner
        .rotate_user_pin(&Secret::new("123456"), &Secret::new("482917"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    let (workflow, _, position) = step_of(&err);
    assert_eq!(workflow, "user PIN change");
    assert_eq!(position, "milestone 'PIN changed.'");
}

#[tokio::test]
async fn test_usage_banners_out_of_order() {
    let provisioner = Provisioner::new(
        ReplayLauncher::new([keytocard_script_with_usages(["SC", "A", "E"])]),
        test_config(),
    );

    let err = provisioner
        .transfer_to_card(&KeyId::new(KEY_ID), &Secret::new("12345678"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AssumptionGuard);
    let replies = provisioner.launcher().replies();
    assert!(replies.iter().all(|reply| reply.value != "keytocard"));
    assert!(replies
        .iter()
        .all(|reply| reply.field.as_deref() != Some("passphrase.enter")));
}

#[tokio::test]
async fn test_unexpected_prompt_is_guard_failure() {
    // gpg skips the algorithm menu and asks for the size straight away
    let script = keygen_menu().line_prompt("keygen.size");
    let provisioner = provisioner(vec![script]);

    let err = provisioner.generate_key(&jane()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AssumptionGuard);
    assert_eq!(step_of(&err).1, 1);
    assert!(provisioner.launcher().replies().is_empty());
}

#[tokio::test]
async fn test_missing_menu_banner() {
    let script = Script::new()
        .line("Please select what kind of key you want:")
        .line("   (1) ECC (sign and encrypt) *default*")
        .line_prompt("keygen.algo");
    let provisioner = provisioner(vec![script]);

    let err = provisioner.generate_key(&jane()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AssumptionGuard);
    assert_eq!(
        step_of(&err).2,
        "guard '(1) RSA and RSA (default)'"
    );
    assert!(provisioner.launcher().replies().is_empty());
}

#[tokio::test]
async fn test_wrong_key_created_kind() {
    let script = keygen_until_passphrase().key_created("P", KEY_ID);
    let provisioner = provisioner(vec![script]);

    let err = provisioner.generate_key(&jane()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AssumptionGuard);
    assert_eq!(step_of(&err).2, "capture KEY_CREATED B");
}

#[tokio::test]
async fn test_key_created_never_arrives() {
    let script = keygen_until_passphrase()
        .line("We need to generate a lot of random bytes.")
        .stall();
    let provisioner = provisioner(vec![script]);

    let err = provisioner.generate_key(&jane()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_peer_exits_before_key_created() {
    let provisioner = provisioner(vec![keygen_until_passphrase().exit_code(2)]);

    let err = provisioner.generate_key(&jane()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EndOfStream);
}

#[tokio::test]
async fn test_missing_acknowledgement() {
    let script = Script::new()
        .line("Application ID ...: D2760001240103040006123456780000")
        .prompt_without_ack(autocard::protocol::PromptKind::Line, "cardedit.prompt")
        .hidden_prompt("passphrase.enter");
    let provisioner = provisioner(vec![script]);

    let err = provisioner
        .rotate_user_pin(&Secret::new("123456"), &Secret::new("482917"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AssumptionGuard);
    // The old PIN was never sent
    assert!(provisioner
        .launcher()
        .replies()
        .iter()
        .all(|reply| reply.field.as_deref() != Some("passphrase.enter")));
}

#[tokio::test]
async fn test_non_zero_exit_after_dialogue() {
    let provisioner = provisioner(vec![user_pin_script().exit_code(1)]);

    let err = provisioner
        .rotate_user_pin(&Secret::new("123456"), &Secret::new("482917"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PeerExit);
    assert!(matches!(err.root(), Error::PeerExit { code: 1 }));
}

#[tokio::test]
async fn test_failed_workflow_stops_provisioning() {
    let broken_subkey = Script::new()
        .line("Secret key is available.")
        .line_prompt("keyedit.prompt")
        .line("   (4) RSA (sign only)")
        .line_prompt("keygen.algo");
    let provisioner = provisioner(vec![keygen_script(KEY_ID), broken_subkey, keytocard_script()]);

    let err = provisioner.provision_new_card(&jane()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AssumptionGuard);
    assert_eq!(step_of(&err).0, "auth subkey addition");
    // The transfer was never started
    assert_eq!(provisioner.launcher().remaining(), 1);
}

#[tokio::test]
async fn test_launch_failure_is_spawn_error() {
    let provisioner = provisioner(vec![]);

    let err = provisioner
        .rotate_admin_pin(&Secret::new("12345678"), &Secret::new("55667788"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Spawn);
}

#[tokio::test]
async fn test_weak_admin_pin_rejected_before_launch() {
    let mut config = test_config();
    config.card.default_admin_pin = "1234".to_string();
    let provisioner = Provisioner::new(ReplayLauncher::new([keygen_script(KEY_ID)]), config);

    let err = provisioner.provision_new_card(&jane()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Credentials);
    assert_eq!(provisioner.launcher().remaining(), 1);
}

#[tokio::test]
async fn test_error_message_names_position() {
    let provisioner = provisioner(vec![user_pin_script_with(false)]);

    let err = provisioner
        .rotate_user_pin(&Secret::new("123456"), &Secret::new("482917"))
        .await
        .unwrap_err();
    let message = err.to_string();

    assert!(message.contains("user PIN change"));
    assert!(message.contains("step 5"));
    assert!(message.contains("PIN changed."));
    assert!(!message.contains("482917"));
}

#[tokio::test]
async fn test_multi_line_default_pin_rejected_before_launch() {
    let mut config = test_config();
    config.card.default_user_pin = "123456\nquit".to_string();
    let provisioner = Provisioner::new(ReplayLauncher::new([user_pin_script()]), config);
    let mut source = FixedPinSource::new(["482917"]);

    let err = provisioner
        .rotate_user_pin_randomly(&mut source)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Credentials);
    assert!(!err.to_string().contains("quit"));
    assert_eq!(provisioner.launcher().remaining(), 1);
    assert!(provisioner.launcher().replies().is_empty());
}
