//! Requesting proxy invoices from an lnproxy service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, Span, debug, info_span, warn};
use url::Url;

use crate::config::ProxyConfig;
use crate::validate::{ProxyInvoiceError, ProxyInvoiceValidator};

#[cfg(test)]
use mockall::automock;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status and a `reason`.
    #[error("lnproxy error ({status}): {reason}")]
    Proxy { status: u16, reason: String },

    #[error("malformed lnproxy response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("proxy invoice rejected: {0}")]
    Rejected(#[from] ProxyInvoiceError),
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    invoice: &'a str,
    /// Sent as a decimal string.
    routing_msat: String,
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    proxy_invoice: String,
}

/// An empty body or a missing `reason` still counts as a refusal.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    reason: String,
}

/// Something that can wrap an invoice into a proxy invoice.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProxyRequester: Send + Sync {
    async fn request(
        &self,
        invoice: String,
        routing_budget_msat: u64,
    ) -> Result<String, RequestError>;
}

#[derive(Clone, Debug)]
pub struct LnProxyClient {
    lnproxy_url: Url,
    reqwest_client: reqwest::Client,
    span: Span,
}

impl LnProxyClient {
    /// Builds a client for `config.lnproxy_url` with the configured timeout.
    ///
    /// Request events go to an `lnproxy` span unless replaced with [`Self::with_span`].
    ///
    /// # Errors
    /// Returns `RequestError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &ProxyConfig) -> Result<LnProxyClient, RequestError> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(LnProxyClient {
            lnproxy_url: config.lnproxy_url.clone(),
            reqwest_client,
            span: info_span!("lnproxy", url = %config.lnproxy_url),
        })
    }

    /// Replaces the span request events are reported into.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    async fn make_request(
        &self,
        invoice: &str,
        routing_budget_msat: u64,
    ) -> Result<String, RequestError> {
        debug!(routing_budget_msat, "requesting proxy invoice");
        let body = ProxyRequest {
            invoice,
            routing_msat: routing_budget_msat.to_string(),
        };
        let response = self
            .reqwest_client
            .post(self.lnproxy_url.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::OK {
            let ProxyResponse { proxy_invoice } = serde_json::from_str(&text)
                .map_err(|_| RequestError::MalformedResponse(text.clone()))?;
            debug!("received proxy invoice");
            return Ok(proxy_invoice);
        }

        let refusal = if text.trim().is_empty() {
            Ok(ErrorResponse::default())
        } else {
            serde_json::from_str::<ErrorResponse>(&text)
        };
        match refusal {
            Ok(ErrorResponse { reason }) => {
                warn!(status = status.as_u16(), "lnproxy error: {reason}");
                Err(RequestError::Proxy {
                    status: status.as_u16(),
                    reason,
                })
            }
            Err(_) => {
                warn!(status = status.as_u16(), "malformed lnproxy response");
                Err(RequestError::MalformedResponse(text))
            }
        }
    }
}

#[async_trait]
impl ProxyRequester for LnProxyClient {
    async fn request(
        &self,
        invoice: String,
        routing_budget_msat: u64,
    ) -> Result<String, RequestError> {
        self.make_request(&invoice, routing_budget_msat)
            .instrument(self.span.clone())
            .await
    }
}

/// Requests a proxy invoice and returns it only if `validator` accepts it.
///
/// # Errors
/// `ProxyError::Request` if the service could not be reached or refused,
/// `ProxyError::Rejected` if the returned invoice fails validation.
pub async fn request_validated_proxy_invoice<R>(
    requester: &R,
    validator: &ProxyInvoiceValidator,
    invoice: &str,
    routing_budget_msat: u64,
) -> Result<String, ProxyError>
where
    R: ProxyRequester + ?Sized,
{
    let proxy_invoice = requester
        .request(invoice.to_owned(), routing_budget_msat)
        .await?;
    validator.validate(invoice, &proxy_invoice, routing_budget_msat)?;
    Ok(proxy_invoice)
}
