//! # Control Plane Service
//!
//! Translates operator messages into ledger and mapper calls. Sentinels and
//! units are handled here; everything else is the ledger's business.

use crate::domain::*;
use crate::ports::ControlPlaneApi;
use lp_01_privacy_mapper::PrivacyMapApi;
use lp_02_accounts::{AccountLedgerApi, AccountRef, AccountUpdate, Expiry};
use shared_types::{AccountId, MilliSatoshi, SessionId, Timestamp};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

fn sat_to_msat(sat: u64) -> ApiResult<MilliSatoshi> {
    sat.checked_mul(MSAT_PER_SAT)
        .ok_or_else(|| ApiError::invalid_params(format!("balance {sat} sat is out of range")))
}

/// `id` if set, `label` otherwise.
fn account_ref(id: &str, label: &str) -> ApiResult<AccountRef> {
    if !id.is_empty() {
        return Ok(AccountRef::Id(AccountId::from_str(id)?));
    }
    if !label.is_empty() {
        return Ok(AccountRef::Label(label.to_string()));
    }
    Err(ApiError::invalid_params("either id or label must be set"))
}

fn creation_expiry(expiration_date: i64) -> ApiResult<Option<Timestamp>> {
    match expiration_date {
        0 => Ok(None),
        at if at > 0 => Ok(Some(at as Timestamp)),
        _ => Err(ApiError::invalid_params("expiration date must not be negative")),
    }
}

fn update_from(request: &UpdateAccountRequest) -> ApiResult<AccountUpdate> {
    let balance = match request.account_balance {
        KEEP => None,
        sat if sat >= 0 => Some(sat_to_msat(sat as u64)?),
        _ => {
            return Err(ApiError::invalid_params(
                "account balance must be -1 or non-negative",
            ))
        }
    };
    let expiration = match request.expiration_date {
        KEEP => None,
        0 => Some(Expiry::Never),
        at if at > 0 => Some(Expiry::At(at as Timestamp)),
        _ => {
            return Err(ApiError::invalid_params(
                "expiration date must be -1, 0 or a timestamp",
            ))
        }
    };
    Ok(AccountUpdate {
        balance,
        expiration,
    })
}

fn session_id(hex: &str) -> ApiResult<SessionId> {
    Ok(SessionId::from_hex(hex)?)
}

pub struct ControlPlaneService {
    ledger: Arc<dyn AccountLedgerApi>,
    mapper: Arc<dyn PrivacyMapApi>,
    shutdown: watch::Sender<bool>,
}

impl ControlPlaneService {
    pub fn new(ledger: Arc<dyn AccountLedgerApi>, mapper: Arc<dyn PrivacyMapApi>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            ledger,
            mapper,
            shutdown,
        }
    }

    /// Flips to `true` once `stop_daemon` is called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl ControlPlaneApi for ControlPlaneService {
    fn create_account(&self, request: CreateAccountRequest) -> ApiResult<CreateAccountResponse> {
        let balance = sat_to_msat(request.account_balance)?;
        let expiration = creation_expiry(request.expiration_date)?;
        let label = Some(request.label.as_str()).filter(|l| !l.is_empty());

        let (account, credential) = self.ledger.create(balance, expiration, label)?;
        Ok(CreateAccountResponse {
            account: AccountView::from(&account),
            credential: credential.to_hex(),
        })
    }

    fn update_account(&self, request: UpdateAccountRequest) -> ApiResult<AccountView> {
        let reference = account_ref(&request.id, &request.label)?;
        let update = update_from(&request)?;
        let account = self.ledger.update(&reference, update)?;
        Ok(AccountView::from(&account))
    }

    fn list_accounts(&self) -> ApiResult<ListAccountsResponse> {
        let accounts = self.ledger.list()?;
        Ok(ListAccountsResponse {
            accounts: accounts.iter().map(AccountView::from).collect(),
        })
    }

    fn account_info(&self, request: AccountInfoRequest) -> ApiResult<AccountView> {
        let reference = account_ref(&request.id, &request.label)?;
        Ok(AccountView::from(&self.ledger.get(&reference)?))
    }

    fn remove_account(&self, request: RemoveAccountRequest) -> ApiResult<()> {
        let reference = account_ref(&request.id, &request.label)?;
        self.ledger.remove(&reference)?;
        Ok(())
    }

    fn privacy_map_conversion(
        &self,
        request: PrivacyMapConversionRequest,
    ) -> ApiResult<PrivacyMapConversionResponse> {
        let session = session_id(&request.session_id)?;
        let output = if request.real_to_pseudo {
            self.mapper.real_to_pseudo(&session, &request.input)?
        } else {
            self.mapper.pseudo_to_real(&session, &request.input)?
        };
        debug!(session = %session, real_to_pseudo = request.real_to_pseudo, "Privacy map conversion");
        Ok(PrivacyMapConversionResponse { output })
    }

    fn privacy_map_conversion_u64(
        &self,
        request: PrivacyMapConversionRequest,
    ) -> ApiResult<PrivacyMapConversionResponse> {
        let session = session_id(&request.session_id)?;
        let input: u64 = request
            .input
            .parse()
            .map_err(|_| ApiError::invalid_params(format!("{:?} is not a u64", request.input)))?;
        let output = if request.real_to_pseudo {
            self.mapper.hide_u64(&session, input)?
        } else {
            self.mapper.reveal_u64(&session, input)?
        };
        Ok(PrivacyMapConversionResponse {
            output: output.to_string(),
        })
    }

    fn get_info(&self) -> GetInfoResponse {
        GetInfoResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn stop_daemon(&self) {
        info!("Shutdown requested");
        self.shutdown.send_replace(true);
    }
}
