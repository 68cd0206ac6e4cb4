//! # Privacy Flows
//!
//! Pseudonyms handed out through the pipeline: per-session isolation,
//! agreement with the control plane, revocation and numeric identifiers.

use super::fixtures::*;
use lp_03_interceptor::domain::methods::{
    GET_CHAN_INFO, GET_INFO, LIST_CHANNELS, LIST_INVOICES, LOOKUP_INVOICE, SEND_PAYMENT_SYNC,
};
use lp_03_interceptor::{PipelineError, RpcMessage, ScriptedForwarder};
use lp_04_control_plane::{ControlPlaneApi, PrivacyMapConversionRequest};
use serde_json::{json, Value};
use shared_types::{ErrorKind, SessionId};

const CHAN_ID: u64 = 770_495_967_390_531_585;
const REMOTE: &str = "03aabbccddeeff00112233445566778899aabbccddeeff00112233445566778899";

/// Node with one invoice and one channel.
fn node() -> ScriptedForwarder {
    let invoice = hex::encode(hash(0x42));
    ScriptedForwarder::new(move |req| {
        let payload = match req.method.as_str() {
            LIST_INVOICES => json!({ "invoices": [{ "r_hash": invoice, "value": "10" }] }),
            LOOKUP_INVOICE => json!({ "r_hash": req.payload["r_hash_str"], "state": "OPEN" }),
            LIST_CHANNELS => json!({
                "channels": [{
                    "chan_id": CHAN_ID,
                    "remote_pubkey": REMOTE,
                    "channel_point": "c0ffee:1",
                }]
            }),
            GET_CHAN_INFO => json!({ "channel_id": req.payload["chan_id"], "node2_pub": REMOTE }),
            _ => json!({}),
        };
        Ok(RpcMessage::new(req.method.clone(), payload))
    })
}

async fn listed_invoice_hash(proxy: &Proxy, session: &SessionId) -> String {
    let response = proxy
        .pipeline
        .intercept(session, RpcMessage::new(LIST_INVOICES, json!({})))
        .await
        .unwrap();
    response.payload["invoices"][0]["r_hash"]
        .as_str()
        .unwrap()
        .to_string()
}

fn lookup(r_hash_str: &str) -> RpcMessage {
    RpcMessage::new(LOOKUP_INVOICE, json!({ "r_hash_str": r_hash_str }))
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let proxy = Proxy::new(node());
    let alice = proxy.session(1, None);
    let bob = proxy.session(2, None);

    let for_alice = listed_invoice_hash(&proxy, &alice).await;
    let for_bob = listed_invoice_hash(&proxy, &bob).await;
    assert_ne!(for_alice, hex::encode(hash(0x42)));
    assert_ne!(for_alice, for_bob);

    // a stable pseudonym within the session
    assert_eq!(listed_invoice_hash(&proxy, &alice).await, for_alice);

    // alice's pseudonym means nothing to bob
    let err = proxy
        .pipeline
        .intercept(&bob, lookup(&for_alice))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::MappingNotFound));
    assert_eq!(proxy.node.calls(), 3);

    let found = proxy
        .pipeline
        .intercept(&alice, lookup(&for_alice))
        .await
        .unwrap();
    assert_eq!(found.payload["r_hash"], json!(for_alice));
    assert_eq!(
        proxy.node.received()[3].payload["r_hash_str"],
        json!(hex::encode(hash(0x42)))
    );
}

#[tokio::test]
async fn test_control_plane_agrees_with_pipeline() {
    let proxy = Proxy::new(node());
    let session = proxy.session(1, None);
    let pseudo = listed_invoice_hash(&proxy, &session).await;

    let request = |real_to_pseudo: bool, input: String| PrivacyMapConversionRequest {
        session_id: session.to_hex(),
        real_to_pseudo,
        input,
    };
    let real = proxy
        .control
        .privacy_map_conversion(request(false, pseudo.clone()))
        .unwrap()
        .output;
    assert_eq!(real, hex::encode(hash(0x42)));

    let again = proxy
        .control
        .privacy_map_conversion(request(true, real))
        .unwrap()
        .output;
    assert_eq!(again, pseudo);
}

#[tokio::test]
async fn test_revocation_forgets_pseudonyms() {
    let proxy = Proxy::new(node());
    let session = proxy.session(1, None);
    let pseudo = listed_invoice_hash(&proxy, &session).await;

    assert!(proxy.registry.revoke(&session).unwrap());
    let err = proxy
        .pipeline
        .intercept(&session, lookup(&pseudo))
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::UnknownSession(session.clone()));

    proxy.session(1, None);
    let err = proxy
        .pipeline
        .intercept(&session, lookup(&pseudo))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::MappingNotFound));
    assert_eq!(proxy.node.calls(), 1);
}

#[tokio::test]
async fn test_channel_ids_round_trip() {
    let proxy = Proxy::new(node());
    let session = proxy.session(1, None);

    let channels = proxy
        .pipeline
        .intercept(&session, RpcMessage::new(LIST_CHANNELS, json!({})))
        .await
        .unwrap();
    let channel = &channels.payload["channels"][0];
    let pseudo_id = channel["chan_id"].as_u64().expect("numbers stay numbers");
    assert_ne!(pseudo_id, CHAN_ID);
    assert_ne!(channel["remote_pubkey"], json!(REMOTE));
    assert_ne!(channel["channel_point"], json!("c0ffee:1"));

    let info = proxy
        .pipeline
        .intercept(
            &session,
            RpcMessage::new(GET_CHAN_INFO, json!({ "chan_id": pseudo_id })),
        )
        .await
        .unwrap();
    assert_eq!(proxy.node.received()[1].payload["chan_id"], json!(CHAN_ID));
    assert_eq!(info.payload["channel_id"], json!(pseudo_id));
    assert_eq!(info.payload["node2_pub"], channel["remote_pubkey"]);
}

#[tokio::test]
async fn test_unlisted_fields_pass_through() {
    let proxy = Proxy::new(node());
    let session = proxy.session(1, None);

    let response = proxy
        .pipeline
        .intercept(&session, RpcMessage::new(LIST_INVOICES, json!({})))
        .await
        .unwrap();
    assert_eq!(response.payload["invoices"][0]["value"], Value::from("10"));
}

#[tokio::test]
async fn test_node_identity_not_leaked_through_side_fields() {
    let node = ScriptedForwarder::new(|req| {
        let payload = match req.method.as_str() {
            GET_INFO => json!({
                "identity_pubkey": REMOTE,
                "uris": [format!("{REMOTE}@1.2.3.4:9735")],
            }),
            _ => json!({
                "payment_error": "",
                "payment_hash": req.payload["payment_hash"],
                "payment_route": {
                    "total_amt_msat": req.payload["amt_msat"],
                    "hops": [{ "pub_key": REMOTE, "chan_id": CHAN_ID.to_string() }],
                },
            }),
        };
        Ok(RpcMessage::new(req.method.clone(), payload))
    });
    let proxy = Proxy::new(node);
    let account = proxy.open_account(10_000, None);
    let session = proxy.session(1, Some(account));

    let info = proxy
        .pipeline
        .intercept(&session, RpcMessage::new(GET_INFO, json!({})))
        .await
        .unwrap();
    let paid = proxy
        .pipeline
        .intercept(&session, payment(SEND_PAYMENT_SYNC, hash(3), 1000))
        .await
        .unwrap();

    for response in [info, paid] {
        let text = response.payload.to_string();
        assert!(!text.contains(REMOTE), "{text}");
        assert!(!text.contains(&CHAN_ID.to_string()), "{text}");
        assert!(!text.contains(&hex::encode(hash(3))), "{text}");
    }
    assert_eq!(proxy.balance(account), 9_000);
}
