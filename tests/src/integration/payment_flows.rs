//! # Payment Flows
//!
//! Spends passing through the pipeline against the ledger: reservation,
//! settlement, refunds and the compensation paths.

use super::fixtures::*;
use lp_02_accounts::{AccountLedgerApi, AccountRef, PaymentStatus};
use lp_03_interceptor::domain::methods::{
    GET_INFO, SEND_PAYMENT_SYNC, SEND_PAYMENT_V2, TRACK_PAYMENT_V2,
};
use lp_03_interceptor::{ForwardError, PipelineConfig, PipelineError, RpcMessage, ScriptedForwarder};
use lp_04_control_plane::{codes, ControlPlaneApi, RemoveAccountRequest};
use serde_json::json;
use shared_types::{ErrorKind, FailingKVStore, InMemoryKVStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_never_overdraw() {
    let proxy = Arc::new(Proxy::new(
        settling_node().with_delay(Duration::from_millis(20)),
    ));
    let account = proxy.open_account(1000, None);
    let session = proxy.session(1, Some(account));

    let mut handles = Vec::new();
    for i in 0..20u8 {
        let proxy = proxy.clone();
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            proxy
                .pipeline
                .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(i), 100))
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e.kind(), Some(ErrorKind::InsufficientBalance)),
        }
    }
    assert_eq!(accepted, 10);
    assert_eq!(proxy.node.calls(), 10);
    assert_eq!(proxy.balance(account), 0);
}

#[tokio::test]
async fn test_in_flight_payment_settles_later() {
    let node = ScriptedForwarder::new(|req| {
        let payload = match req.method.as_str() {
            TRACK_PAYMENT_V2 => json!({
                "payment_hash": req.payload["payment_hash"],
                "status": "SUCCEEDED",
                "value_msat": "370",
                "fee_msat": "10",
            }),
            _ => json!({ "payment_hash": req.payload["payment_hash"], "status": "IN_FLIGHT" }),
        };
        Ok(RpcMessage::new(req.method.clone(), payload))
    });
    let proxy = Proxy::new(node);
    let account = proxy.open_account(1000, None);
    let session = proxy.session(1, Some(account));

    let sent = proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_V2, hash(1), 400))
        .await
        .unwrap();
    assert_eq!(proxy.balance(account), 600);

    // the reservation blocks removal until the payment resolves
    let remove = RemoveAccountRequest {
        id: account.to_hex(),
        label: String::new(),
    };
    let err = proxy.control.remove_account(remove.clone()).unwrap_err();
    assert_eq!(err.code, codes::VALIDATION);

    // the application tracks the payment by the hash it was shown
    let tracked = proxy
        .pipeline
        .intercept(
            &session,
            RpcMessage::new(
                TRACK_PAYMENT_V2,
                json!({ "payment_hash": sent.payload["payment_hash"] }),
            ),
        )
        .await
        .unwrap();
    assert_eq!(
        proxy.node.received()[1].payload["payment_hash"],
        json!(hex::encode(hash(1)))
    );
    assert_eq!(tracked.payload["payment_hash"], sent.payload["payment_hash"]);

    let acc = proxy.ledger.get(&AccountRef::Id(account)).unwrap();
    assert_eq!(acc.payments[&hash(1)].status, PaymentStatus::Succeeded);
    assert_eq!(proxy.balance(account), 620);
    proxy.control.remove_account(remove).unwrap();
}

#[tokio::test]
async fn test_spend_without_account_is_declined() {
    let proxy = Proxy::new(settling_node());
    let session = proxy.session(1, None);

    let err = proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(1), 999_999_999_999))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Declined { rule: "accounts", .. }));
    assert_eq!(err.kind(), Some(ErrorKind::Validation));
    assert_eq!(proxy.node.calls(), 0);
}

#[tokio::test]
async fn test_failed_payment_is_refunded_and_retryable() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let node = ScriptedForwarder::new(move |req| {
        let payload = if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            json!({ "payment_error": "unable to find a path to destination" })
        } else {
            json!({ "payment_route": { "total_amt_msat": "400" } })
        };
        Ok(RpcMessage::new(req.method.clone(), payload))
    });
    let proxy = Proxy::new(node);
    let account = proxy.open_account(1000, None);
    let session = proxy.session(1, Some(account));

    proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(1), 400))
        .await
        .unwrap();
    assert_eq!(proxy.balance(account), 1000);
    let acc = proxy.ledger.get(&AccountRef::Id(account)).unwrap();
    assert_eq!(acc.payments[&hash(1)].status, PaymentStatus::Failed);

    proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(1), 400))
        .await
        .unwrap();
    assert_eq!(proxy.balance(account), 600);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fee_limit_is_reserved_and_unused_fee_refunded() {
    let node = ScriptedForwarder::replying(json!({ "payment_route": { "total_amt_msat": "1010" } }));
    let proxy = Proxy::new(node);
    let account = proxy.open_account(1050, None);
    let session = proxy.session(1, Some(account));

    let request = |fee: u64| {
        RpcMessage::new(
            SEND_PAYMENT_SYNC,
            json!({
                "payment_hash": hex::encode(hash(fee as u8)),
                "amt_msat": "1000",
                "fee_limit_msat": fee.to_string(),
            }),
        )
    };

    let err = proxy.pipeline.intercept(&session, request(51)).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InsufficientBalance));
    assert_eq!(proxy.node.calls(), 0);

    proxy.pipeline.intercept(&session, request(50)).await.unwrap();
    assert_eq!(proxy.balance(account), 40);
}

#[tokio::test]
async fn test_expired_account_declines() {
    let proxy = Proxy::new(settling_node());
    let account = proxy.open_account(1000, Some(NOW + 60));
    let session = proxy.session(1, Some(account));

    proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(1), 100))
        .await
        .unwrap();

    proxy.time.advance(61);
    let err = proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(2), 100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Declined {
            kind: ErrorKind::Validation,
            ..
        }
    ));
    assert_eq!(proxy.node.calls(), 1);
    assert_eq!(proxy.balance(account), 900);
}

#[tokio::test]
async fn test_node_outage_releases_reservation() {
    let proxy = Proxy::new(ScriptedForwarder::unavailable());
    let account = proxy.open_account(1000, None);
    let session = proxy.session(1, Some(account));

    let err = proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(1), 700))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Forward(ForwardError::Unavailable(_))));
    assert_eq!(proxy.balance(account), 1000);

    // nothing is left pending, so the account can go
    proxy
        .control
        .remove_account(RemoveAccountRequest {
            id: account.to_hex(),
            label: String::new(),
        })
        .unwrap();
}

#[tokio::test]
async fn test_slow_node_times_out_and_refunds() {
    let proxy = Proxy::with_stores(
        Arc::new(InMemoryKVStore::new()),
        Arc::new(InMemoryKVStore::new()),
        settling_node().with_delay(Duration::from_secs(5)),
        PipelineConfig {
            forward_timeout_ms: 30,
        },
    );
    let account = proxy.open_account(1000, None);
    let session = proxy.session(1, Some(account));

    let err = proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(1), 700))
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::Timeout { after_ms: 30 });
    assert_eq!(proxy.balance(account), 1000);
}

#[tokio::test]
async fn test_mapper_write_failure_drops_response() {
    let proxy = Proxy::with_stores(
        Arc::new(FailingKVStore::new()),
        Arc::new(InMemoryKVStore::new()),
        ScriptedForwarder::replying(json!({ "identity_pubkey": "02".repeat(33) })),
        PipelineConfig::default(),
    );
    let session = proxy.session(1, None);

    let err = proxy
        .pipeline
        .intercept(&session, RpcMessage::new(GET_INFO, json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ResponseRule { rule: "privacy", .. }));
    assert_eq!(err.kind(), Some(ErrorKind::InternalStorage));
    assert_eq!(proxy.node.calls(), 1);
}
