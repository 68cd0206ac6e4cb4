//! Cross-subsystem integration scenarios.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod invoice_flows;
#[cfg(test)]
mod payment_flows;
#[cfg(test)]
mod privacy_flows;
