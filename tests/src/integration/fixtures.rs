//! Test harness: every subsystem wired over in-memory stores, with a
//! scripted node behind the pipeline.

use lp_01_privacy_mapper::{MapperConfig, PrivacyMapper};
use lp_02_accounts::{AccountLedgerApi, AccountRef, AccountService, StaticCredentialIssuer};
use lp_03_interceptor::domain::methods::is_spend;
use lp_03_interceptor::{
    AccountRule, InterceptorPipeline, PipelineConfig, PrivacyRule, RpcMessage, ScriptedForwarder,
    SessionRegistry,
};
use lp_04_control_plane::ControlPlaneService;
use serde_json::{json, Value};
use shared_types::{
    AccountId, Hash, InMemoryKVStore, KeyValueStore, MilliSatoshi, MockTimeSource, SessionId,
    Timestamp,
};
use std::sync::Arc;

pub const NOW: Timestamp = 1_700_000_000;

pub struct Proxy {
    pub time: Arc<MockTimeSource>,
    pub mapper: Arc<PrivacyMapper>,
    pub ledger: Arc<AccountService>,
    pub registry: Arc<SessionRegistry>,
    pub pipeline: Arc<InterceptorPipeline>,
    pub control: ControlPlaneService,
    pub node: Arc<ScriptedForwarder>,
}

impl Proxy {
    pub fn new(node: ScriptedForwarder) -> Self {
        Self::with_stores(
            Arc::new(InMemoryKVStore::new()),
            Arc::new(InMemoryKVStore::new()),
            node,
            PipelineConfig::default(),
        )
    }

    pub fn with_stores(
        mapper_store: Arc<dyn KeyValueStore>,
        ledger_store: Arc<dyn KeyValueStore>,
        node: ScriptedForwarder,
        config: PipelineConfig,
    ) -> Self {
        let time = Arc::new(MockTimeSource::new(NOW));
        let mapper = Arc::new(PrivacyMapper::new(mapper_store, MapperConfig::default()));
        let ledger = Arc::new(AccountService::new(
            ledger_store,
            time.clone(),
            Arc::new(StaticCredentialIssuer),
        ));
        let registry = Arc::new(SessionRegistry::new(mapper.clone()));
        let node = Arc::new(node);
        let pipeline = Arc::new(InterceptorPipeline::new(
            registry.clone(),
            Arc::new(PrivacyRule::new(mapper.clone())),
            Arc::new(AccountRule::new(ledger.clone())),
            node.clone(),
            config,
        ));
        let control = ControlPlaneService::new(ledger.clone(), mapper.clone());
        Self {
            time,
            mapper,
            ledger,
            registry,
            pipeline,
            control,
            node,
        }
    }

    pub fn open_account(&self, msat: MilliSatoshi, expiration: Option<Timestamp>) -> AccountId {
        let (account, _) = self
            .ledger
            .create(msat, expiration, None)
            .expect("account creation");
        account.id
    }

    /// Bind a fresh session, optionally to an account.
    pub fn session(&self, tag: u8, account: Option<AccountId>) -> SessionId {
        let session = SessionId::new(vec![tag; 32]);
        self.registry.bind(session.clone(), account);
        session
    }

    pub fn balance(&self, account: AccountId) -> i64 {
        self.ledger
            .get(&AccountRef::Id(account))
            .expect("account exists")
            .current_balance
    }
}

pub fn hash(byte: u8) -> Hash {
    [byte; 32]
}

pub fn payment(method: &str, hash: Hash, amt_msat: MilliSatoshi) -> RpcMessage {
    RpcMessage::new(
        method,
        json!({ "payment_hash": hex::encode(hash), "amt_msat": amt_msat.to_string() }),
    )
}

/// Spend responses charging exactly `amt_msat`; empty answers otherwise.
pub fn settling_node() -> ScriptedForwarder {
    ScriptedForwarder::new(|req| {
        let payload = if is_spend(&req.method) {
            json!({
                "payment_error": "",
                "payment_hash": req.payload["payment_hash"],
                "payment_route": { "total_amt_msat": req.payload["amt_msat"] },
            })
        } else {
            Value::Object(Default::default())
        };
        Ok(RpcMessage::new(req.method.clone(), payload))
    })
}
