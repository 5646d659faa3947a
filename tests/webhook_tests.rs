mod common;

use common::{cli, run, word_after};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

fn create_paid_down_session(state: &std::path::Path) -> String {
    run(
        state,
        &[
            "order", "create", "--name", "Ada", "--email", "ada@example.com", "--service",
            "design", "--amount", "100000",
        ],
    );
    let start = run(state, &["pay", "start", "1", "--leg", "down"]);
    word_after(&start, "session ").to_string()
}

#[test]
fn duplicate_settlement_webhook_is_a_no_op() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let session = create_paid_down_session(&state);

    run(&state, &["gateway", "settle", &session]);
    let first = run(&state, &["gateway", "notify", &session]);
    assert!(first.contains("ack (applied -> paid)"));

    let second = run(&state, &["gateway", "notify", &session]);
    assert!(second.contains("ack (no change (paid))"), "{second}");

    // Exactly two emails: the receipt and one confirmation, not two.
    let outbox = run(&state, &["outbox"]);
    assert_eq!(outbox.lines().count(), 2, "{outbox}");
}

#[test]
fn tampered_webhook_is_acked_but_not_applied() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let session = create_paid_down_session(&state);

    let mut payload = NamedTempFile::new().unwrap();
    write!(
        payload,
        r#"{{"order_id":"{session}","status_code":"200","gross_amount":"20000","signature_key":"forged","transaction_status":"settlement"}}"#
    )
    .unwrap();

    // The processor still gets its acknowledgement.
    cli(&state)
        .arg("webhook")
        .arg(payload.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ack"));

    let show = run(&state, &["order", "show", "1"]);
    assert!(show.contains("down=pending"));
}

#[test]
fn malformed_session_id_in_webhook_is_acked_and_logged() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    create_paid_down_session(&state);

    // Signature is valid but the session id does not follow the convention,
    // so reconciliation fails closed; the ack still goes out.
    let mut payload = NamedTempFile::new().unwrap();
    let signature = atelier_orders::interfaces::webhook::WebhookNotification::sign(
        "garbage",
        "200",
        "20000",
        "sandbox-server-key",
    );
    write!(
        payload,
        r#"{{"order_id":"garbage","status_code":"200","gross_amount":"20000","signature_key":"{signature}","transaction_status":"settlement"}}"#
    )
    .unwrap();

    cli(&state)
        .arg("webhook")
        .arg(payload.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ack"));

    let show = run(&state, &["order", "show", "1"]);
    assert!(show.contains("down=pending"));
}

#[test]
fn denied_payment_resets_the_leg_via_sync() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let session = create_paid_down_session(&state);

    run(&state, &["gateway", "deny", &session]);
    let sync = run(&state, &["pay", "sync", "1"]);
    assert!(sync.contains("applied -> unpaid"), "{sync}");

    let show = run(&state, &["order", "show", "1"]);
    assert!(show.contains("status=pending"));
    assert!(show.contains("down=unpaid"));
    assert!(show.contains("chat=off"));

    // The order stays recoverable: a fresh attempt gets a fresh session.
    let retry = run(&state, &["pay", "start", "1", "--leg", "down"]);
    let second = word_after(&retry, "session ");
    assert_ne!(second, session);
}

#[test]
fn expired_session_keeps_order_retryable() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let session = create_paid_down_session(&state);

    run(&state, &["gateway", "expire", &session]);
    let ack = run(&state, &["gateway", "notify", &session]);
    assert!(ack.contains("applied -> unpaid"), "{ack}");

    let show = run(&state, &["order", "show", "1"]);
    assert!(show.contains("down=unpaid"));
}
