//! # Account Rule
//!
//! Enforces the spending limit of the account bound to a session.
//!
//! | Method | Request | Response |
//! |--------|---------|----------|
//! | `SendPaymentSync`, `SendPaymentV2` | reserve amount + fee limit | settle or fail the reservation |
//! | `TrackPaymentV2` | - | settle or fail the account's payment by `payment_hash` |
//! | `AddInvoice` | - | associate `r_hash` with the account |
//! | `ChannelBalance` | - | report the account balance instead of the node's |
//!
//! The rule runs after the privacy rule on requests and before it on
//! responses, so it only ever sees real values.
//!
//! A reservation made for a call is remembered per call id until the
//! response or an abort resolves it. An `IN_FLIGHT` response leaves the
//! ledger entry in flight until a terminal `TrackPaymentV2` update for the
//! same hash settles or fails it.

use super::{Decline, RequestVerdict, Rule};
use crate::domain::message::{as_u64, field};
use crate::domain::methods::{is_spend, ADD_INVOICE, CHANNEL_BALANCE, TRACK_PAYMENT_V2};
use crate::domain::{CallContext, CallId, RpcMessage, RuleError};
use dashmap::DashMap;
use lp_02_accounts::{AccountError, AccountLedgerApi, AccountRef, DeclineReason, ReserveOutcome};
use serde_json::{json, Value};
use shared_types::{parse_hash, AccountId, ErrorKind, Hash, MilliSatoshi};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reservation made on behalf of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reservation {
    account: AccountId,
    hash: Hash,
    amount: MilliSatoshi,
}

/// What a spend response says about the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentResult {
    Settled(MilliSatoshi),
    Failed,
    Pending,
}

/// Classify a `SendPaymentSync` / `SendPaymentV2` / `TrackPaymentV2` response.
fn classify(payload: &Value) -> PaymentResult {
    let failed_with_error = payload
        .get("payment_error")
        .and_then(Value::as_str)
        .is_some_and(|e| !e.is_empty());
    if failed_with_error {
        return PaymentResult::Failed;
    }
    match payload.get("status").and_then(Value::as_str) {
        Some("FAILED") => return PaymentResult::Failed,
        Some("IN_FLIGHT") | Some("INITIATED") => return PaymentResult::Pending,
        _ => {}
    }
    if let Some(total) = field(payload, "payment_route.total_amt_msat").and_then(as_u64) {
        return PaymentResult::Settled(total);
    }
    let value = payload.get("value_msat").and_then(as_u64);
    let fee = payload.get("fee_msat").and_then(as_u64).unwrap_or(0);
    match value.and_then(|v| v.checked_add(fee)) {
        Some(total) => PaymentResult::Settled(total),
        None => PaymentResult::Pending,
    }
}

/// Amount to reserve for a spend request: amount plus fee limit, in msat.
fn spend_amount(payload: &Value) -> Result<MilliSatoshi, String> {
    let amount = match payload.get("amt_msat").and_then(as_u64).filter(|a| *a > 0) {
        Some(msat) => msat,
        None => payload
            .get("amt")
            .and_then(as_u64)
            .filter(|a| *a > 0)
            .ok_or("payment amount is required")?
            .checked_mul(1000)
            .ok_or("payment amount overflows")?,
    };
    let fee_limit = payload
        .get("fee_limit_msat")
        .and_then(as_u64)
        .or_else(|| field(payload, "fee_limit.fixed_msat").and_then(as_u64))
        .unwrap_or(0);
    amount
        .checked_add(fee_limit)
        .ok_or_else(|| "payment amount overflows".to_string())
}

fn payment_hash(payload: &Value) -> Result<Hash, String> {
    let hex = payload
        .get("payment_hash")
        .and_then(Value::as_str)
        .ok_or("payment_hash is required")?;
    parse_hash(hex).map_err(|e| format!("payment_hash: {e}"))
}

/// Spending-limit enforcement for account-bound sessions.
pub struct AccountRule {
    ledger: Arc<dyn AccountLedgerApi>,
    in_flight: DashMap<CallId, Reservation>,
}

impl AccountRule {
    pub fn new(ledger: Arc<dyn AccountLedgerApi>) -> Self {
        Self {
            ledger,
            in_flight: DashMap::new(),
        }
    }

    /// Calls currently holding a reservation.
    pub fn pending_calls(&self) -> usize {
        self.in_flight.len()
    }

    fn reserve(
        &self,
        ctx: &CallContext,
        account: AccountId,
        request: RpcMessage,
    ) -> Result<RequestVerdict, RuleError> {
        let parsed = payment_hash(&request.payload)
            .and_then(|hash| spend_amount(&request.payload).map(|amount| (hash, amount)));
        let (hash, amount) = match parsed {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!(call = %ctx.call_id, %reason, "Spend request rejected");
                return Ok(RequestVerdict::Decline(Decline::new(
                    ErrorKind::Validation,
                    reason,
                )));
            }
        };

        match self.ledger.reserve_payment(&account, &hash, amount) {
            Ok(ReserveOutcome::Reserved { remaining }) => {
                self.in_flight.insert(
                    ctx.call_id,
                    Reservation {
                        account,
                        hash,
                        amount,
                    },
                );
                debug!(call = %ctx.call_id, account = %account, amount, remaining, "Spend reserved");
                Ok(RequestVerdict::Continue(request))
            }
            Ok(ReserveOutcome::Declined(reason)) => {
                let kind = match reason {
                    DeclineReason::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
                    DeclineReason::Expired { .. } => ErrorKind::Validation,
                };
                Ok(RequestVerdict::Decline(Decline::new(kind, reason.to_string())))
            }
            Err(e) if e.kind() == ErrorKind::Validation => {
                Ok(RequestVerdict::Decline(Decline::new(e.kind(), e.to_string())))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn resolve_spend(&self, ctx: &CallContext, payload: &Value) -> Result<(), RuleError> {
        let Some((_, reservation)) = self.in_flight.remove(&ctx.call_id) else {
            return Ok(());
        };
        let Reservation { account, hash, .. } = reservation;
        match classify(payload) {
            PaymentResult::Settled(actual) => {
                self.ledger.settle_payment(&account, &hash, actual)?;
            }
            PaymentResult::Failed => {
                self.ledger.fail_payment(&account, &hash)?;
            }
            PaymentResult::Pending => {
                info!(
                    call = %ctx.call_id,
                    account = %account,
                    "Payment still in flight, reservation kept"
                );
            }
        }
        Ok(())
    }

    /// Resolve an in-flight payment from a tracking update.
    fn track_payment(
        &self,
        ctx: &CallContext,
        account: &AccountId,
        payload: &Value,
    ) -> Result<(), RuleError> {
        let hash = payment_hash(payload).map_err(|e| RuleError::malformed("payment_hash", e))?;
        let resolved = match classify(payload) {
            PaymentResult::Settled(actual) => self.ledger.settle_payment(account, &hash, actual),
            PaymentResult::Failed => self.ledger.fail_payment(account, &hash),
            PaymentResult::Pending => return Ok(()),
        };
        match resolved {
            Ok(_) => Ok(()),
            // paid through another account or outside the proxy
            Err(AccountError::UnknownPayment { .. }) => {
                debug!(call = %ctx.call_id, account = %account, "Tracked payment not owned by account");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn associate_invoice(
        &self,
        account: &AccountId,
        payload: &Value,
    ) -> Result<(), RuleError> {
        let hex = payload
            .get("r_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| RuleError::malformed("r_hash", "missing"))?;
        let hash = parse_hash(hex).map_err(|e| RuleError::malformed("r_hash", e.to_string()))?;
        self.ledger.associate_invoice(account, &hash)?;
        Ok(())
    }

    fn account_balance(&self, account: &AccountId) -> Result<Value, RuleError> {
        let acc = self.ledger.get(&AccountRef::Id(*account))?;
        let msat = acc.current_balance.max(0) as u64;
        let sat = msat / 1000;
        Ok(json!({
            "balance": sat.to_string(),
            "local_balance": { "sat": sat.to_string(), "msat": msat.to_string() },
            "remote_balance": { "sat": "0", "msat": "0" },
            "unsettled_local_balance": { "sat": "0", "msat": "0" },
            "unsettled_remote_balance": { "sat": "0", "msat": "0" },
            "pending_open_local_balance": { "sat": "0", "msat": "0" },
            "pending_open_remote_balance": { "sat": "0", "msat": "0" },
        }))
    }
}

impl Rule for AccountRule {
    fn name(&self) -> &'static str {
        "accounts"
    }

    fn handle_request(
        &self,
        ctx: &CallContext,
        request: RpcMessage,
    ) -> Result<RequestVerdict, RuleError> {
        if !is_spend(&request.method) {
            return Ok(RequestVerdict::Continue(request));
        }
        match ctx.account {
            Some(account) => self.reserve(ctx, account, request),
            None => {
                warn!(call = %ctx.call_id, session = %ctx.session, "Spend from a session without an account");
                Ok(RequestVerdict::Decline(Decline::new(
                    ErrorKind::Validation,
                    "spending requires an account-bound session",
                )))
            }
        }
    }

    fn handle_response(
        &self,
        ctx: &CallContext,
        mut response: RpcMessage,
    ) -> Result<RpcMessage, RuleError> {
        let Some(account) = ctx.account else {
            return Ok(response);
        };
        match response.method.as_str() {
            method if is_spend(method) => self.resolve_spend(ctx, &response.payload)?,
            TRACK_PAYMENT_V2 => self.track_payment(ctx, &account, &response.payload)?,
            ADD_INVOICE => self.associate_invoice(&account, &response.payload)?,
            CHANNEL_BALANCE => response.payload = self.account_balance(&account)?,
            _ => {}
        }
        Ok(response)
    }

    fn abort(&self, ctx: &CallContext) {
        let Some((_, reservation)) = self.in_flight.remove(&ctx.call_id) else {
            return;
        };
        match self
            .ledger
            .fail_payment(&reservation.account, &reservation.hash)
        {
            Ok(acc) => warn!(
                call = %ctx.call_id,
                account = %reservation.account,
                refunded = reservation.amount,
                balance = acc.current_balance,
                "Call aborted, reservation released"
            ),
            Err(e) => error!(
                call = %ctx.call_id,
                account = %reservation.account,
                error = %e,
                "Failed to release reservation of aborted call"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::methods::{GET_INFO, SEND_PAYMENT_SYNC, SEND_PAYMENT_V2};
    use lp_02_accounts::{AccountService, PaymentStatus, StaticCredentialIssuer};
    use shared_types::{InMemoryKVStore, MockTimeSource, SessionId};

    fn setup(balance: u64) -> (AccountRule, Arc<AccountService>, AccountId) {
        let ledger = Arc::new(AccountService::new(
            Arc::new(InMemoryKVStore::new()),
            Arc::new(MockTimeSource::new(1_700_000_000)),
            Arc::new(StaticCredentialIssuer),
        ));
        let (account, _) = ledger.create(balance, None, None).unwrap();
        (AccountRule::new(ledger.clone()), ledger, account.id)
    }

    fn ctx(account: AccountId, method: &str) -> CallContext {
        CallContext::new(SessionId::new(vec![1]), Some(account), method)
    }

    fn balance(ledger: &AccountService, id: AccountId) -> i64 {
        ledger.get(&AccountRef::Id(id)).unwrap().current_balance
    }

    fn spend(hash: u8, payload: Value) -> RpcMessage {
        let mut payload = payload;
        payload["payment_hash"] = json!(hex::encode([hash; 32]));
        RpcMessage::new(SEND_PAYMENT_SYNC, payload)
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&json!({"payment_error": "no route"})),
            PaymentResult::Failed
        );
        assert_eq!(classify(&json!({"status": "FAILED"})), PaymentResult::Failed);
        assert_eq!(classify(&json!({"status": "IN_FLIGHT"})), PaymentResult::Pending);
        assert_eq!(
            classify(&json!({"payment_error": "", "payment_route": {"total_amt_msat": "1010"}})),
            PaymentResult::Settled(1010)
        );
        assert_eq!(
            classify(&json!({"status": "SUCCEEDED", "value_msat": "1000", "fee_msat": "3"})),
            PaymentResult::Settled(1003)
        );
        assert_eq!(classify(&json!({})), PaymentResult::Pending);
    }

    #[test]
    fn test_spend_amount() {
        assert_eq!(spend_amount(&json!({"amt_msat": "1500"})), Ok(1500));
        assert_eq!(spend_amount(&json!({"amt": 2})), Ok(2000));
        assert_eq!(
            spend_amount(&json!({"amt": 2, "fee_limit": {"fixed_msat": "100"}})),
            Ok(2100)
        );
        assert_eq!(
            spend_amount(&json!({"amt_msat": 10, "fee_limit_msat": 5})),
            Ok(15)
        );
        assert!(spend_amount(&json!({})).is_err());
        assert!(spend_amount(&json!({"amt": u64::MAX})).is_err());
    }

    #[test]
    fn test_reserve_and_settle() {
        let (rule, ledger, id) = setup(10_000);
        let ctx = ctx(id, SEND_PAYMENT_SYNC);

        let verdict = rule
            .handle_request(&ctx, spend(1, json!({"amt": 4, "fee_limit_msat": 100})))
            .unwrap();
        assert!(matches!(verdict, RequestVerdict::Continue(_)));
        assert_eq!(balance(&ledger, id), 5_900);
        assert_eq!(rule.pending_calls(), 1);

        rule.handle_response(
            &ctx,
            RpcMessage::new(
                SEND_PAYMENT_SYNC,
                json!({"payment_route": {"total_amt_msat": "4020"}}),
            ),
        )
        .unwrap();
        assert_eq!(balance(&ledger, id), 5_980);
        assert_eq!(rule.pending_calls(), 0);
    }

    #[test]
    fn test_failed_payment_refunds() {
        let (rule, ledger, id) = setup(10_000);
        let ctx = ctx(id, SEND_PAYMENT_SYNC);
        rule.handle_request(&ctx, spend(1, json!({"amt_msat": 3000})))
            .unwrap();
        rule.handle_response(
            &ctx,
            RpcMessage::new(SEND_PAYMENT_SYNC, json!({"payment_error": "no route"})),
        )
        .unwrap();
        assert_eq!(balance(&ledger, id), 10_000);
    }

    #[test]
    fn test_in_flight_response_keeps_reservation() {
        let (rule, ledger, id) = setup(10_000);
        let ctx = ctx(id, SEND_PAYMENT_V2);
        let mut request = spend(1, json!({"amt_msat": 3000}));
        request.method = SEND_PAYMENT_V2.into();
        rule.handle_request(&ctx, request).unwrap();
        rule.handle_response(
            &ctx,
            RpcMessage::new(SEND_PAYMENT_V2, json!({"status": "IN_FLIGHT"})),
        )
        .unwrap();

        let acc = ledger.get(&AccountRef::Id(id)).unwrap();
        assert_eq!(acc.current_balance, 7_000);
        assert_eq!(acc.payments[&[1u8; 32]].status, PaymentStatus::InFlight);
        assert_eq!(rule.pending_calls(), 0);
    }

    #[test]
    fn test_tracked_payment_resolves_in_flight_entry() {
        let (rule, ledger, id) = setup(10_000);
        let mut request = spend(1, json!({"amt_msat": 3000}));
        request.method = SEND_PAYMENT_V2.into();
        let send = ctx(id, SEND_PAYMENT_V2);
        rule.handle_request(&send, request).unwrap();
        rule.handle_response(
            &send,
            RpcMessage::new(SEND_PAYMENT_V2, json!({"status": "IN_FLIGHT"})),
        )
        .unwrap();

        let track = ctx(id, TRACK_PAYMENT_V2);
        let update = |payload: Value| {
            let mut payload = payload;
            payload["payment_hash"] = json!(hex::encode([1u8; 32]));
            RpcMessage::new(TRACK_PAYMENT_V2, payload)
        };
        rule.handle_response(&track, update(json!({"status": "IN_FLIGHT"})))
            .unwrap();
        assert_eq!(balance(&ledger, id), 7_000);

        rule.handle_response(
            &track,
            update(json!({"status": "SUCCEEDED", "value_msat": "2500", "fee_msat": "10"})),
        )
        .unwrap();
        let acc = ledger.get(&AccountRef::Id(id)).unwrap();
        assert_eq!(acc.current_balance, 7_490);
        assert_eq!(acc.payments[&[1u8; 32]].status, PaymentStatus::Succeeded);

        // a later update for a final payment changes nothing
        rule.handle_response(&track, update(json!({"status": "FAILED"})))
            .unwrap();
        assert_eq!(balance(&ledger, id), 7_490);
    }

    #[test]
    fn test_tracked_failure_refunds() {
        let (rule, ledger, id) = setup(10_000);
        let send = ctx(id, SEND_PAYMENT_SYNC);
        rule.handle_request(&send, spend(2, json!({"amt_msat": 4000})))
            .unwrap();
        rule.handle_response(&send, RpcMessage::new(SEND_PAYMENT_SYNC, json!({})))
            .unwrap();
        assert_eq!(balance(&ledger, id), 6_000);

        rule.handle_response(
            &ctx(id, TRACK_PAYMENT_V2),
            RpcMessage::new(
                TRACK_PAYMENT_V2,
                json!({"payment_hash": hex::encode([2u8; 32]), "status": "FAILED"}),
            ),
        )
        .unwrap();
        assert_eq!(balance(&ledger, id), 10_000);
    }

    #[test]
    fn test_tracked_foreign_payment_ignored() {
        let (rule, ledger, id) = setup(10_000);
        let out = rule
            .handle_response(
                &ctx(id, TRACK_PAYMENT_V2),
                RpcMessage::new(
                    TRACK_PAYMENT_V2,
                    json!({"payment_hash": hex::encode([5u8; 32]), "status": "SUCCEEDED", "value_msat": "100"}),
                ),
            )
            .unwrap();
        assert_eq!(out.payload["status"], json!("SUCCEEDED"));
        assert_eq!(balance(&ledger, id), 10_000);
    }

    #[test]
    fn test_insufficient_balance_declines() {
        let (rule, ledger, id) = setup(1_000);
        let verdict = rule
            .handle_request(&ctx(id, SEND_PAYMENT_SYNC), spend(1, json!({"amt": 2})))
            .unwrap();
        match verdict {
            RequestVerdict::Decline(d) => assert_eq!(d.kind, ErrorKind::InsufficientBalance),
            other => panic!("expected decline, got {other:?}"),
        }
        assert_eq!(balance(&ledger, id), 1_000);
        assert_eq!(rule.pending_calls(), 0);
    }

    #[test]
    fn test_malformed_spend_declines() {
        let (rule, _, id) = setup(1_000);
        let verdict = rule
            .handle_request(
                &ctx(id, SEND_PAYMENT_SYNC),
                RpcMessage::new(SEND_PAYMENT_SYNC, json!({"payment_request": "lnbc1..."})),
            )
            .unwrap();
        assert!(matches!(
            verdict,
            RequestVerdict::Decline(Decline { kind: ErrorKind::Validation, .. })
        ));
    }

    #[test]
    fn test_duplicate_hash_declines() {
        let (rule, _, id) = setup(10_000);
        rule.handle_request(&ctx(id, SEND_PAYMENT_SYNC), spend(1, json!({"amt": 1})))
            .unwrap();
        let verdict = rule
            .handle_request(&ctx(id, SEND_PAYMENT_SYNC), spend(1, json!({"amt": 1})))
            .unwrap();
        assert!(matches!(verdict, RequestVerdict::Decline(_)));
    }

    #[test]
    fn test_abort_releases_reservation() {
        let (rule, ledger, id) = setup(10_000);
        let ctx = ctx(id, SEND_PAYMENT_SYNC);
        rule.handle_request(&ctx, spend(1, json!({"amt": 5})))
            .unwrap();
        assert_eq!(balance(&ledger, id), 5_000);

        rule.abort(&ctx);
        rule.abort(&ctx);
        assert_eq!(balance(&ledger, id), 10_000);
    }

    #[test]
    fn test_add_invoice_associates_hash() {
        let (rule, ledger, id) = setup(0);
        let hash = [9u8; 32];
        rule.handle_response(
            &ctx(id, ADD_INVOICE),
            RpcMessage::new(ADD_INVOICE, json!({"r_hash": hex::encode(hash)})),
        )
        .unwrap();

        let credited = ledger.invoice_settled(&hash, 2_500).unwrap().unwrap();
        assert_eq!(credited.id, id);
        assert_eq!(credited.current_balance, 2_500);
    }

    #[test]
    fn test_add_invoice_without_hash_fails() {
        let (rule, _, id) = setup(0);
        let err = rule
            .handle_response(&ctx(id, ADD_INVOICE), RpcMessage::new(ADD_INVOICE, json!({})))
            .unwrap_err();
        assert!(matches!(err, RuleError::Malformed { .. }));
    }

    #[test]
    fn test_channel_balance_rewritten() {
        let (rule, _, id) = setup(12_345);
        let out = rule
            .handle_response(
                &ctx(id, CHANNEL_BALANCE),
                RpcMessage::new(
                    CHANNEL_BALANCE,
                    json!({"balance": "999999", "local_balance": {"sat": "999999", "msat": "999999000"}}),
                ),
            )
            .unwrap();
        assert_eq!(out.payload["balance"], json!("12"));
        assert_eq!(out.payload["local_balance"]["msat"], json!("12345"));
        assert_eq!(out.payload["remote_balance"]["sat"], json!("0"));
    }

    #[test]
    fn test_unbound_session_cannot_spend() {
        let (rule, _, _) = setup(0);
        let ctx = CallContext::new(SessionId::new(vec![2]), None, SEND_PAYMENT_SYNC);
        let verdict = rule
            .handle_request(&ctx, spend(1, json!({"amt_msat": "999999999999"})))
            .unwrap();
        assert!(matches!(
            verdict,
            RequestVerdict::Decline(Decline { kind: ErrorKind::Validation, .. })
        ));
        assert_eq!(rule.pending_calls(), 0);

        let ctx = CallContext::new(SessionId::new(vec![2]), None, GET_INFO);
        let verdict = rule
            .handle_request(&ctx, RpcMessage::new(GET_INFO, json!({})))
            .unwrap();
        assert!(matches!(verdict, RequestVerdict::Continue(_)));
    }
}
