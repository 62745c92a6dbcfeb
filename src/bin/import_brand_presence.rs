//! # import-brand-presence
//!
//! Pulls a site's weekly brand presence exports from the LLMO data CDN into
//! Postgres and refreshes the reporting views. Files imported before are
//! skipped unless `--force` is given.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command, crate_authors, crate_version};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use spacecat::brand_presence::import::{ensure_tables, ensure_views};
use spacecat::brand_presence::{CdnClient, DEFAULT_CDN_BASE_URL, ImportOptions, sync_site};
use spacecat::utils::validation::{llmo_data_folder, normalize_base_url};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("import-brand-presence")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Import brand presence exports for a site into Postgres")
        .arg(
            Arg::new("site-id")
                .short('s')
                .long("site-id")
                .num_args(1)
                .required(true)
                .help("SpaceCat site id the rows are stored under"),
        )
        .arg(
            Arg::new("base-url")
                .short('b')
                .long("base-url")
                .num_args(1)
                .required(true)
                .help("Base URL of the site; its domain marks owned sources"),
        )
        .arg(
            Arg::new("data-folder")
                .long("data-folder")
                .num_args(1)
                .help("CDN folder holding the exports (derived from the base URL by default)"),
        )
        .arg(
            Arg::new("competitor")
                .short('c')
                .long("competitor")
                .num_args(1)
                .action(ArgAction::Append)
                .help("competitor domain; may be given more than once"),
        )
        .arg(
            Arg::new("cdn-base-url")
                .long("cdn-base-url")
                .num_args(1)
                .env("LLMO_CDN_BASE_URL")
                .default_value(DEFAULT_CDN_BASE_URL),
        )
        .arg(
            Arg::new("database-url")
                .short('d')
                .long("database-url")
                .num_args(1)
                .env("DATABASE_URL")
                .required(true)
                .help("Postgres connection string"),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .help("re-import files that were imported before"),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .help("fetch and map the exports without writing"),
        )
        .arg(
            Arg::new("plain")
                .short('p')
                .long("plain")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .help("log in human-readable format, not JSON/structured logging"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .help("produce prolix output"),
        )
        .get_matches();

    spacecat::configure_logging(matches.get_flag("verbose"), matches.get_flag("plain"))?;
    info!("import-brand-presence {}", crate_version!());

    let raw_base_url = matches
        .get_one::<String>("base-url")
        .context("--base-url is required")?;
    let base_url = normalize_base_url(raw_base_url).map_err(anyhow::Error::msg)?;
    let data_folder = match matches.get_one::<String>("data-folder") {
        Some(folder) => folder.clone(),
        None => llmo_data_folder(&base_url)
            .with_context(|| format!("Cannot derive a data folder from {base_url}"))?,
    };

    let options = ImportOptions {
        site_id: matches
            .get_one::<String>("site-id")
            .context("--site-id is required")?
            .clone(),
        base_url,
        data_folder,
        competitors: matches
            .get_many::<String>("competitor")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        force: matches.get_flag("force"),
        dry_run: matches.get_flag("dry-run"),
    };

    let cdn_base_url = matches
        .get_one::<String>("cdn-base-url")
        .map_or(DEFAULT_CDN_BASE_URL, String::as_str);
    let cdn = CdnClient::new(cdn_base_url)?;

    let database_url = matches
        .get_one::<String>("database-url")
        .context("--database-url is required")?;
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;

    if !options.dry_run {
        ensure_tables(&pool).await?;
        ensure_views(&pool).await?;
    }
    let summary = sync_site(&pool, &cdn, &options).await?;
    info!(
        found = summary.files_found,
        imported = summary.files_imported,
        skipped = summary.files_skipped,
        records = summary.records,
        sources = summary.sources,
        dry_run = options.dry_run,
        "Import finished"
    );

    pool.close().await;
    Ok(())
}
