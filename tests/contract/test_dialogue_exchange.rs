//! Contract Tests for the Prompt/Reply Exchange
//!
//! `exchange` answers exactly the prompt it names, exactly once, and only
//! counts as done once the peer acknowledges the reply.

use std::time::Duration;

use autocard::dialogue::{exchange, Reply};
use autocard::protocol::PromptKind;
use autocard::pty::{ReplyLog, Script, ScriptedPeer};
use autocard::session::{Session, SessionOptions};
use autocard::{ErrorKind, Secret};

fn session(script: Script) -> (Session, ReplyLog) {
    let peer = ScriptedPeer::new(script);
    let replies = peer.replies();
    let options = SessionOptions {
        timeout: Duration::from_millis(300),
        ..SessionOptions::new("contract")
    };
    (Session::new(Box::new(peer), options), replies)
}

#[tokio::test]
async fn test_exchange_returns_prompt_kind() {
    let (mut session, _) = session(
        Script::new()
            .line_prompt("keygen.name")
            .hidden_prompt("passphrase.enter")
            .bool_prompt("keyedit.save.okay"),
    );

    let line = exchange(&mut session, "keygen.name", &Reply::text("Jane Doe")).await;
    let hidden = exchange(&mut session, "passphrase.enter", &Reply::from(Secret::empty())).await;
    let boolean = exchange(&mut session, "keyedit.save.okay", &Reply::text("y")).await;

    assert_eq!(line.unwrap(), PromptKind::Line);
    assert_eq!(hidden.unwrap(), PromptKind::Hidden);
    assert_eq!(boolean.unwrap(), PromptKind::Bool);
}

#[tokio::test]
async fn test_second_exchange_for_single_prompt_fails() {
    let (mut session, replies) = session(Script::new().line_prompt("keyedit.prompt"));

    exchange(&mut session, "keyedit.prompt", &Reply::text("toggle"))
        .await
        .unwrap();
    let err = exchange(&mut session, "keyedit.prompt", &Reply::text("toggle"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        ErrorKind::EndOfStream | ErrorKind::Timeout
    ));
    assert_eq!(replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_exchange_times_out_while_peer_waits() {
    let (mut session, _) = session(Script::new().line_prompt("keygen.size").stall());

    exchange(&mut session, "keygen.size", &Reply::text("4096"))
        .await
        .unwrap();
    let err = exchange(&mut session, "keygen.size", &Reply::text("4096"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_field_names_match_exactly() {
    for asked in ["keygen.Size", "keygen.size2", "keygen"] {
        let (mut session, replies) = session(Script::new().line_prompt(asked));

        let err = exchange(&mut session, "keygen.size", &Reply::text("4096"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AssumptionGuard, "asked {}", asked);
        assert!(replies.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_reply_waits_for_the_prompt() {
    // Banner text mentioning the field is not a prompt
    let (mut session, replies) = session(
        Script::new()
            .line("keygen.size GET_LINE keygen.size")
            .line_prompt("keygen.size"),
    );

    exchange(&mut session, "keygen.size", &Reply::text("4096"))
        .await
        .unwrap();

    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].value, "4096");
}

#[tokio::test]
async fn test_status_line_split_across_chunks() {
    let (mut session, _) = session(
        Script::new()
            .text("[GNU")
            .text("PG:] GET_HIDDEN passph")
            .text("rase.enter\n"),
    );

    let kind = session.expect_prompt("passphrase.enter").await.unwrap();
    assert_eq!(kind, PromptKind::Hidden);
}

#[tokio::test]
async fn test_secret_reply_reaches_peer_only() {
    let (mut session, replies) = session(Script::new().hidden_prompt("passphrase.enter"));

    exchange(
        &mut session,
        "passphrase.enter",
        &Reply::Secret(Secret::new("12345678")),
    )
    .await
    .unwrap();

    assert_eq!(replies.lock().unwrap()[0].value, "12345678");
    assert!(!session.transcript().render().contains("12345678"));
}

#[tokio::test]
async fn test_reply_to_exited_peer_fails() {
    let (mut session, _) = session(Script::new().line("gpg: no valid OpenPGP data found."));

    session.expect_eof().await.unwrap();
    let err = session.send("quit").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChannelWrite);
}
