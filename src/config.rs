use std::time::Duration;

use clap::Parser;
use url::Url;

/// Default lnproxy endpoint.
pub const DEFAULT_LNPROXY_URL: &str = "https://lnproxy.org/spec";

/// Where to request proxy invoices and what routing fee to offer.
///
/// Every field can be set by flag or by environment variable.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    #[clap(long, env = "LNPROXY_URL", default_value = DEFAULT_LNPROXY_URL)]
    pub lnproxy_url: Url,

    /// Flat part of the routing budget
    #[clap(long, env = "LNPROXY_BASE_MSAT", default_value_t = 1_000)]
    pub base_msat: u64,

    /// Proportional part of the routing budget, in parts per million of the amount
    #[clap(long, env = "LNPROXY_PPM", default_value_t = 1_000)]
    pub ppm: u64,

    #[clap(long, env = "LNPROXY_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    /// Points at [`DEFAULT_LNPROXY_URL`] with a 1000 msat base and 1000 ppm.
    ///
    /// # Panics
    /// Only if the hardcoded [`DEFAULT_LNPROXY_URL`] stops being a valid URL.
    fn default() -> Self {
        Self {
            lnproxy_url: DEFAULT_LNPROXY_URL
                .parse()
                .expect("default lnproxy url is valid"),
            base_msat: 1_000,
            ppm: 1_000,
            timeout_secs: 30,
        }
    }
}

impl ProxyConfig {
    /// Config for `lnproxy_url` with the given fee terms and the default timeout.
    #[must_use]
    pub fn new(lnproxy_url: Url, base_msat: u64, ppm: u64) -> Self {
        Self {
            lnproxy_url,
            base_msat,
            ppm,
            ..Default::default()
        }
    }

    /// Routing budget for an invoice of `amount_msat`: `base + amount * ppm / 1_000_000`.
    ///
    /// Returns `None` if the computation overflows.
    #[must_use]
    pub fn routing_budget_msat(&self, amount_msat: u64) -> Option<u64> {
        let proportional = u128::from(amount_msat) * u128::from(self.ppm) / 1_000_000;
        u64::try_from(proportional)
            .ok()?
            .checked_add(self.base_msat)
    }

    /// Request timeout for the lnproxy HTTP client.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
