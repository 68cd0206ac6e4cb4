//! Node RPC methods the rules know about.
//!
//! Methods are identified by their full gRPC path. Anything not listed here
//! passes through the rules untouched.

pub const GET_INFO: &str = "/lnrpc.Lightning/GetInfo";
pub const CHANNEL_BALANCE: &str = "/lnrpc.Lightning/ChannelBalance";
pub const ADD_INVOICE: &str = "/lnrpc.Lightning/AddInvoice";
pub const LIST_INVOICES: &str = "/lnrpc.Lightning/ListInvoices";
pub const LOOKUP_INVOICE: &str = "/lnrpc.Lightning/LookupInvoice";
pub const LIST_PAYMENTS: &str = "/lnrpc.Lightning/ListPayments";
pub const LIST_CHANNELS: &str = "/lnrpc.Lightning/ListChannels";
pub const GET_CHAN_INFO: &str = "/lnrpc.Lightning/GetChanInfo";
pub const FORWARDING_HISTORY: &str = "/lnrpc.Lightning/ForwardingHistory";
pub const SEND_PAYMENT_SYNC: &str = "/lnrpc.Lightning/SendPaymentSync";
pub const SEND_PAYMENT_V2: &str = "/routerrpc.Router/SendPaymentV2";
pub const TRACK_PAYMENT_V2: &str = "/routerrpc.Router/TrackPaymentV2";

/// Methods that spend from the node's balance.
pub fn is_spend(method: &str) -> bool {
    matches!(method, SEND_PAYMENT_SYNC | SEND_PAYMENT_V2)
}
