//! Decoding of BOLT11 invoices and validation of lnproxy-wrapped invoices.
//!
//! This crate supports:
//! - Decoding the amount, payment hash, description and signature of an invoice.
//! - Checking that a proxy invoice keeps the payment hash and description of the
//!   original, adds exactly the agreed routing budget, and pays a different node.
//! - Requesting proxy invoices from an lnproxy service over HTTP.
//!
//! The bech32 checksum of an invoice is not verified.

pub mod config;
pub mod invoice;
pub mod proxy;
pub mod validate;

#[cfg(test)]
mod fixture;

pub use config::ProxyConfig;
pub use invoice::{DecodeError, InvoiceFields, Multiplier, decode_invoice};
pub use proxy::{
    LnProxyClient, ProxyError, ProxyRequester, RequestError, request_validated_proxy_invoice,
};
pub use validate::{
    ProxyInvoiceError, ProxyInvoiceValidator, validate_decoded, validate_proxy_invoice,
};
