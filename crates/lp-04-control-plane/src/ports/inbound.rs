//! # Inbound Port - ControlPlaneApi
//!
//! Operator-facing operations. Each one is a single call into the ledger or
//! the mapper; no state lives here.

use crate::domain::*;

pub trait ControlPlaneApi: Send + Sync {
    fn create_account(&self, request: CreateAccountRequest) -> ApiResult<CreateAccountResponse>;

    /// Apply the non-sentinel fields of `request`.
    fn update_account(&self, request: UpdateAccountRequest) -> ApiResult<AccountView>;

    fn list_accounts(&self) -> ApiResult<ListAccountsResponse>;

    fn account_info(&self, request: AccountInfoRequest) -> ApiResult<AccountView>;

    fn remove_account(&self, request: RemoveAccountRequest) -> ApiResult<()>;

    fn privacy_map_conversion(
        &self,
        request: PrivacyMapConversionRequest,
    ) -> ApiResult<PrivacyMapConversionResponse>;

    /// Like [`ControlPlaneApi::privacy_map_conversion`] for decimal integer
    /// inputs, run through the numeric codec in both directions.
    fn privacy_map_conversion_u64(
        &self,
        request: PrivacyMapConversionRequest,
    ) -> ApiResult<PrivacyMapConversionResponse>;

    fn get_info(&self) -> GetInfoResponse;

    /// Ask the daemon to shut down.
    fn stop_daemon(&self);
}
