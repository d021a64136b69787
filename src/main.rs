use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use lnproxy_invoice::{
    LnProxyClient, ProxyConfig, ProxyInvoiceValidator, decode_invoice,
    request_validated_proxy_invoice,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fields of an invoice
    Decode { invoice: String },
    /// Check a proxy invoice against the original
    Validate {
        original: String,
        proxy: String,
        #[arg(long)]
        routing_msat: u64,
    },
    /// Request a proxy invoice and print it if it passes validation
    Wrap {
        invoice: String,
        /// Overrides the budget computed from base fee and ppm
        #[arg(long)]
        routing_msat: Option<u64>,
        #[command(flatten)]
        config: ProxyConfig,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Opts::parse().command {
        Command::Decode { invoice } => {
            let decoded = decode_invoice(&invoice)?;
            println!("{decoded}");
        }
        Command::Validate {
            original,
            proxy,
            routing_msat,
        } => {
            ProxyInvoiceValidator::default().validate(&original, &proxy, routing_msat)?;
            println!("proxy invoice accepted");
        }
        Command::Wrap {
            invoice,
            routing_msat,
            config,
        } => {
            let routing_msat = match routing_msat {
                Some(routing_msat) => routing_msat,
                None => {
                    let decoded = decode_invoice(&invoice)?;
                    if !decoded.has_amount {
                        bail!("amount-less invoices need an explicit --routing-msat");
                    }
                    config
                        .routing_budget_msat(decoded.amount_msat)
                        .context("routing budget overflows")?
                }
            };
            info!(routing_msat, url = %config.lnproxy_url, "wrapping invoice");

            let client = LnProxyClient::new(&config)?;
            let proxy = request_validated_proxy_invoice(
                &client,
                &ProxyInvoiceValidator::default(),
                &invoice,
                routing_msat,
            )
            .await?;
            println!("{proxy}");
        }
    }

    Ok(())
}
