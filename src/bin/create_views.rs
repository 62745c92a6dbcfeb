//! # create-brand-presence-views
//!
//! Creates (or re-creates) the brand presence tables, the materialized views
//! built on them and the function that refreshes those views. Run it once per
//! database, and again with `--drop` whenever the view definitions change.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command, crate_authors, crate_version};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use spacecat::brand_presence::import::{ensure_tables, refresh_views};
use spacecat::brand_presence::schema;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("create-brand-presence-views")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Create the brand presence materialized views")
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
            Arg::new("drop")
                .long("drop")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .help("drop the views and refresh function before creating them"),
        )
        .arg(
            Arg::new("refresh-only")
                .short('r')
                .long("refresh-only")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .conflicts_with("drop")
                .help("only refresh existing views"),
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
    info!("create-brand-presence-views {}", crate_version!());

    let database_url = matches
        .get_one::<String>("database-url")
        .context("--database-url is required")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;

    if !matches.get_flag("refresh-only") {
        ensure_tables(&pool).await?;

        if matches.get_flag("drop") {
            for statement in schema::drop_views_statements() {
                sqlx::query(&statement).execute(&pool).await?;
            }
            info!("Existing views dropped");
        }

        for statement in schema::create_views_statements() {
            sqlx::query(&statement)
                .execute(&pool)
                .await
                .with_context(|| format!("Failed to run: {statement}"))?;
        }
        info!(
            topics = schema::TOPICS_VIEW,
            prompts = schema::PROMPTS_VIEW,
            "Views created"
        );
    }

    refresh_views(&pool).await?;
    pool.close().await;
    Ok(())
}
