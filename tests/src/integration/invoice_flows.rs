//! # Invoice Flows
//!
//! Invoices created through an account-bound session and the settlement
//! notifications that credit them.

use super::fixtures::*;
use lp_02_accounts::AccountLedgerApi;
use lp_03_interceptor::domain::methods::{ADD_INVOICE, CHANNEL_BALANCE};
use lp_03_interceptor::{PipelineError, RpcMessage, ScriptedForwarder};
use lp_04_control_plane::{AccountInfoRequest, ControlPlaneApi};
use serde_json::json;
use shared_types::ErrorKind;

fn invoicing_node(r_hash: u8) -> ScriptedForwarder {
    ScriptedForwarder::replying(json!({
        "r_hash": hex::encode(hash(r_hash)),
        "payment_request": format!("lnbc50n1{}", hex::encode(hash(r_hash))),
        "add_index": "1",
    }))
}

fn add_invoice() -> RpcMessage {
    RpcMessage::new(ADD_INVOICE, json!({ "value": "5" }))
}

#[tokio::test]
async fn test_settled_invoice_credits_creator() {
    let proxy = Proxy::new(invoicing_node(7));
    let account = proxy.open_account(1000, None);
    let session = proxy.session(1, Some(account));

    let response = proxy
        .pipeline
        .intercept(&session, add_invoice())
        .await
        .unwrap();
    assert_ne!(response.payload["r_hash"], json!(hex::encode(hash(7))));
    // the invoice string embeds the hash, so it is hidden too
    let request = response.payload["payment_request"].as_str().unwrap();
    assert!(!request.contains(&hex::encode(hash(7))));
    assert_eq!(request.len(), "lnbc50n1".len() + 64);

    let credited = proxy.ledger.invoice_settled(&hash(7), 5000).unwrap().unwrap();
    assert_eq!(credited.id, account);
    assert_eq!(proxy.balance(account), 6000);

    // a repeated notification is not credited twice
    proxy.ledger.invoice_settled(&hash(7), 5000).unwrap();
    assert_eq!(proxy.balance(account), 6000);

    let view = proxy
        .control
        .account_info(AccountInfoRequest {
            id: account.to_hex(),
            label: String::new(),
        })
        .unwrap();
    assert_eq!(view.current_balance, 6);
    assert_eq!(view.invoices.len(), 1);
    assert_eq!(view.invoices[0].hash, hex::encode(hash(7)));
}

#[tokio::test]
async fn test_unowned_invoice_is_ignored() {
    let proxy = Proxy::new(invoicing_node(7));
    let account = proxy.open_account(1000, None);

    // created through a session with no account
    let session = proxy.session(1, None);
    proxy
        .pipeline
        .intercept(&session, add_invoice())
        .await
        .unwrap();

    assert_eq!(proxy.ledger.invoice_settled(&hash(7), 5000).unwrap(), None);
    assert_eq!(proxy.balance(account), 1000);
}

#[tokio::test]
async fn test_channel_balance_reports_account() {
    let proxy = Proxy::new(ScriptedForwarder::replying(json!({
        "balance": "9000000",
        "local_balance": { "sat": "9000000", "msat": "9000000000" },
    })));
    let account = proxy.open_account(2_500_000, None);

    let scoped = proxy.session(1, Some(account));
    let response = proxy
        .pipeline
        .intercept(&scoped, RpcMessage::new(CHANNEL_BALANCE, json!({})))
        .await
        .unwrap();
    assert_eq!(response.payload["balance"], json!("2500"));
    assert_eq!(response.payload["local_balance"]["msat"], json!("2500000"));
    assert_eq!(response.payload["remote_balance"]["sat"], json!("0"));

    let unscoped = proxy.session(2, None);
    let response = proxy
        .pipeline
        .intercept(&unscoped, RpcMessage::new(CHANNEL_BALANCE, json!({})))
        .await
        .unwrap();
    assert_eq!(response.payload["balance"], json!("9000000"));
}

#[tokio::test]
async fn test_invoice_claimed_by_another_account_fails_closed() {
    let proxy = Proxy::new(invoicing_node(7));
    let first = proxy.open_account(1000, None);
    let second = proxy.open_account(1000, None);
    let first_session = proxy.session(1, Some(first));
    let second_session = proxy.session(2, Some(second));

    proxy
        .pipeline
        .intercept(&first_session, add_invoice())
        .await
        .unwrap();

    let err = proxy
        .pipeline
        .intercept(&second_session, add_invoice())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ResponseRule { rule: "accounts", .. }));
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    let credited = proxy.ledger.invoice_settled(&hash(7), 1).unwrap().unwrap();
    assert_eq!(credited.id, first);
}
