/// SpaceCat - the API service behind site audits, LLMO onboarding and traffic reports.
///
/// The crate is deployed as an API Lambda that serves:
/// 1. The REST surface for sites, audits, preflight jobs, trial users,
///    consent banner screenshots and paid traffic
/// 2. The Slack bot: `app_mention` commands and the LLMO onboarding modal
///
/// Long-running work (audits, imports, scrapes) is handed to workers over SQS.
/// Two maintenance binaries manage the brand presence tables and views in Postgres.
///
/// # Architecture
///
/// The system uses:
/// - AWS Lambda for serverless execution
/// - SQS for handing jobs to the audit, import and scrape workers
/// - S3 for scrape results, screenshots and the traffic report cache
/// - Athena for RUM traffic queries
/// - Postgres (sqlx) for brand presence data
/// - slack-morphism for Slack API interactions
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use spacecat::context::AppContext;
/// use spacecat::core::config::AppConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     spacecat::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let app = AppContext::from_config(config).await?;
///
///     let sites = app.data_access.all_sites().await?;
///     println!("{} sites", sites.len());
///     Ok(())
/// }
/// ```
pub mod api;
pub mod aws;
pub mod brand_presence;
pub mod context;
pub mod controllers;
pub mod core;
pub mod data_access;
pub mod errors;
pub mod slack;
pub mod traffic;
pub mod utils;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// This function sets up tracing-subscriber with a JSON formatter suitable for
/// `CloudWatch` Logs integration. The level comes from `RUST_LOG` and defaults
/// to `info`. It should be called once at the start of each Lambda handler.
///
/// Calling it again is a no-op.
///
/// # Example
///
/// ```
/// spacecat::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Logging for the maintenance binaries: JSON by default, compact text with
/// `plain`, `DEBUG` with `verbose`. `RUST_LOG` overrides the level.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` cannot be parsed or a global subscriber is
/// already installed.
pub fn configure_logging(verbose: bool, plain: bool) -> anyhow::Result<()> {
    use anyhow::Context;
    use tracing::Level;
    use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("Failed to parse RUST_LOG")?;
    let formatter: Box<dyn Layer<Registry> + Send + Sync> = if plain {
        Box::new(
            fmt::Layer::default()
                .compact()
                .with_ansi(false)
                .with_writer(std::io::stdout),
        )
    } else {
        Box::new(fmt::Layer::default().json().with_writer(std::io::stdout))
    };
    tracing::subscriber::set_global_default(Registry::default().with(formatter).with(filter))
        .context("Failed to set the tracing subscriber")
}
