//! Checks that a proxy invoice is an acceptable substitute for an original one.

use crate::invoice::{DecodeError, InvoiceFields, decode_invoice};
use thiserror::Error;
use tracing::{Span, debug, info_span, warn};

/// Reasons a proxy invoice is refused.
///
/// Every variant means "do not pay the proxy invoice".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyInvoiceError {
    #[error("invalid original invoice: {0}")]
    OriginalInvalid(DecodeError),

    #[error("invalid proxy invoice: {0}")]
    ProxyInvalid(DecodeError),

    #[error("payment hash does not match")]
    PaymentHashMismatch,

    #[error("description does not match")]
    DescriptionMismatch,

    /// The proxy amount is not exactly the original amount plus the budget.
    #[error(
        "routing budget not respected: {original_msat} + {routing_budget_msat} msat != {proxy_msat} msat"
    )]
    RoutingBudgetMismatch {
        original_msat: u64,
        routing_budget_msat: u64,
        proxy_msat: u64,
    },

    /// Same signature on both invoices, so the payment is not routed through the proxy.
    #[error("proxy invoice pays the original destination")]
    DestinationNotProxied,
}

/// Decode both invoices and check the proxy against the original.
///
/// `Ok(())` means the proxy invoice is accepted.
///
/// # Errors
/// Returns the first failed check, in this order: original decode, proxy
/// decode, payment hash, description mode, description, amount, signature.
pub fn validate_proxy_invoice(
    original: &str,
    proxy: &str,
    routing_budget_msat: u64,
) -> Result<(), ProxyInvoiceError> {
    let original = decode_invoice(original).map_err(ProxyInvoiceError::OriginalInvalid)?;
    let proxy = decode_invoice(proxy).map_err(ProxyInvoiceError::ProxyInvalid)?;
    validate_decoded(&original, &proxy, routing_budget_msat)
}

/// The comparison half of [`validate_proxy_invoice`], for already decoded invoices.
///
/// # Errors
/// Returns the first failed check.
pub fn validate_decoded(
    original: &InvoiceFields,
    proxy: &InvoiceFields,
    routing_budget_msat: u64,
) -> Result<(), ProxyInvoiceError> {
    if original.payment_hash != proxy.payment_hash {
        return Err(ProxyInvoiceError::PaymentHashMismatch);
    }
    if original.description_is_hash != proxy.description_is_hash
        || original.description != proxy.description
    {
        return Err(ProxyInvoiceError::DescriptionMismatch);
    }
    // An overflowing sum can never equal a u64 amount.
    if original.amount_msat.checked_add(routing_budget_msat) != Some(proxy.amount_msat) {
        return Err(ProxyInvoiceError::RoutingBudgetMismatch {
            original_msat: original.amount_msat,
            routing_budget_msat,
            proxy_msat: proxy.amount_msat,
        });
    }
    if original.signature == proxy.signature {
        return Err(ProxyInvoiceError::DestinationNotProxied);
    }
    Ok(())
}

/// Validator that reports its verdicts into an injected tracing span.
#[derive(Clone, Debug)]
pub struct ProxyInvoiceValidator {
    span: Span,
}

impl Default for ProxyInvoiceValidator {
    fn default() -> Self {
        Self::new(info_span!("proxy_invoice_validator"))
    }
}

impl ProxyInvoiceValidator {
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Same as [`validate_proxy_invoice`], with the verdict logged.
    ///
    /// # Errors
    /// Returns the first failed check.
    pub fn validate(
        &self,
        original: &str,
        proxy: &str,
        routing_budget_msat: u64,
    ) -> Result<(), ProxyInvoiceError> {
        let _entered = self.span.enter();
        let verdict = validate_proxy_invoice(original, proxy, routing_budget_msat);
        match &verdict {
            Ok(()) => debug!(routing_budget_msat, "proxy invoice accepted"),
            Err(err) => warn!(routing_budget_msat, "proxy invoice rejected: {err}"),
        }
        verdict
    }
}
