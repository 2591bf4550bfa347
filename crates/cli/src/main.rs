use anyhow::Context;
use clap::{Parser, Subcommand};
use cofin_core::http::{HttpBackendClient, MarketDataApi};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod watch;

#[derive(Debug, Parser)]
#[command(name = "cofin")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a live dashboard session and log state changes until Ctrl-C.
    Watch {
        /// Ticker to show. Defaults to the last one watched.
        #[arg(long)]
        symbol: Option<String>,

        /// First day of the news window (YYYY-MM-DD).
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Last day of the news window (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Exchange code for market status. Overrides MARKET_EXCHANGE.
        #[arg(long)]
        exchange: Option<String>,
    },

    /// Print the latest quote.
    Quote { symbol: String },

    /// Print the full dashboard bundle.
    Dashboard { symbol: String },

    /// Print company news for a date range.
    News {
        symbol: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Print the exchange's market status.
    MarketStatus {
        #[arg(long)]
        exchange: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = cofin_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let res = run(args.command, settings).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "command failed");
    }
    res
}

async fn run(command: Command, mut settings: cofin_core::config::Settings) -> anyhow::Result<()> {
    match command {
        Command::Watch {
            symbol,
            from,
            to,
            exchange,
        } => {
            if let Some(exchange) = exchange {
                settings.exchange = exchange;
            }
            let range = match (from, to) {
                (Some(from), Some(to)) => Some((parse_date(&from)?, parse_date(&to)?)),
                _ => None,
            };
            watch::run(&settings, symbol, range).await
        }
        Command::Quote { symbol } => {
            let api = HttpBackendClient::from_settings(&settings)?;
            print_json(&api.quote(&symbol.to_uppercase()).await?)
        }
        Command::Dashboard { symbol } => {
            let api = HttpBackendClient::from_settings(&settings)?;
            print_json(&api.dashboard(&symbol.to_uppercase()).await?)
        }
        Command::News { symbol, from, to } => {
            let api = HttpBackendClient::from_settings(&settings)?;
            let (from, to) = (parse_date(&from)?, parse_date(&to)?);
            anyhow::ensure!(from <= to, "--from must not be after --to ({from} > {to})");
            print_json(&api.company_news(&symbol.to_uppercase(), from, to).await?)
        }
        Command::MarketStatus { exchange } => {
            let api = HttpBackendClient::from_settings(&settings)?;
            let exchange = exchange.unwrap_or_else(|| settings.exchange.clone());
            print_json(&api.market_status(&exchange).await?)
        }
    }
}

fn parse_date(s: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date {s:?} (expected YYYY-MM-DD)"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}

fn init_sentry(settings: &cofin_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_with_news_window() {
        let args = Args::try_parse_from([
            "cofin", "watch", "--symbol", "msft", "--from", "2026-01-02", "--to", "2026-01-06",
        ])
        .unwrap();

        match args.command {
            Command::Watch {
                symbol, from, to, ..
            } => {
                assert_eq!(symbol.as_deref(), Some("msft"));
                assert_eq!(from.as_deref(), Some("2026-01-02"));
                assert_eq!(to.as_deref(), Some("2026-01-06"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn watch_range_needs_both_ends() {
        let res = Args::try_parse_from(["cofin", "watch", "--from", "2026-01-02"]);
        assert!(res.is_err());
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("2026-01-06").is_ok());
        let err = parse_date("06/01/2026").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }
}
