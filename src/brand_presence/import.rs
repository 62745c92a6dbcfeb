//! CDN to Postgres sync of brand-presence exports.

use std::collections::HashSet;

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument, warn};

use super::cdn::CdnClient;
use super::models::{BrandPresenceFile, BrandPresenceRecord, record_from_row};
use super::schema;
use super::sources::SourceClassifier;
use crate::errors::SpaceCatError;

/// Rows per multi-row `INSERT` for cited sources.
const SOURCE_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub site_id: String,
    pub base_url: String,
    pub data_folder: String,
    pub competitors: Vec<String>,
    /// Re-import files that were imported before, replacing their rows.
    pub force: bool,
    /// Fetch and map, but write nothing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files_found: usize,
    pub files_imported: usize,
    pub files_skipped: usize,
    pub records: usize,
    pub sources: usize,
}

/// Brand-presence files in `paths` that still need importing, oldest week first.
#[must_use]
pub fn pending_files(
    paths: &[String],
    already_imported: &HashSet<String>,
    force: bool,
) -> Vec<BrandPresenceFile> {
    let mut files: Vec<BrandPresenceFile> = paths
        .iter()
        .filter_map(|p| BrandPresenceFile::from_path(p))
        .filter(|f| force || !already_imported.contains(&f.path))
        .collect();
    files.sort_by(|a, b| a.week.cmp(&b.week).then_with(|| a.model.cmp(&b.model)));
    files.dedup_by(|a, b| a.path == b.path);
    files
}

/// Paths already imported for `site_id`. A database without the imports
/// table has imported nothing yet.
///
/// # Errors
///
/// Returns an error if the lookup query fails.
pub async fn imported_paths(pool: &PgPool, site_id: &str) -> Result<HashSet<String>, SpaceCatError> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT to_regclass('brand_presence_imports') IS NOT NULL")
            .fetch_one(pool)
            .await?;
    if !exists {
        return Ok(HashSet::new());
    }
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT file_path FROM brand_presence_imports WHERE site_id = $1")
            .bind(site_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}

/// Writes all records of one file in a single transaction.
async fn write_file(
    pool: &PgPool,
    site_id: &str,
    file: &BrandPresenceFile,
    records: &[BrandPresenceRecord],
) -> Result<usize, SpaceCatError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM brand_presence WHERE site_id = $1 AND source_file = $2")
        .bind(site_id)
        .bind(&file.path)
        .execute(&mut *tx)
        .await?;

    let mut pending_sources: Vec<(i64, &super::models::ClassifiedSource)> = Vec::new();
    for record in records {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO brand_presence (site_id, date, model, category, topic, prompt, region, \
             origin, volume, mentions, citations, visibility_score, position, sentiment, answer, \
             source_file) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING id",
        )
        .bind(&record.site_id)
        .bind(record.date)
        .bind(&record.model)
        .bind(&record.category)
        .bind(&record.topic)
        .bind(&record.prompt)
        .bind(&record.region)
        .bind(&record.origin)
        .bind(record.volume)
        .bind(record.mentions)
        .bind(record.citations)
        .bind(record.visibility_score)
        .bind(record.position)
        .bind(&record.sentiment)
        .bind(&record.answer)
        .bind(&file.path)
        .fetch_one(&mut *tx)
        .await?;
        pending_sources.extend(record.sources.iter().map(|s| (id, s)));
    }

    for chunk in pending_sources.chunks(SOURCE_BATCH_SIZE) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO brand_presence_sources \
             (brand_presence_id, url, normalized_url, hostname, content_type) ",
        );
        builder.push_values(chunk, |mut row, (id, source)| {
            row.push_bind(*id)
                .push_bind(source.url.clone())
                .push_bind(source.normalized_url.clone())
                .push_bind(source.hostname.clone())
                .push_bind(source.content_type.as_str());
        });
        builder.build().execute(&mut *tx).await?;
    }

    sqlx::query(
        "INSERT INTO brand_presence_imports (site_id, file_path, record_count) VALUES ($1, $2, $3) \
         ON CONFLICT (site_id, file_path) DO UPDATE SET record_count = EXCLUDED.record_count, \
         imported_at = now()",
    )
    .bind(site_id)
    .bind(&file.path)
    .bind(i32::try_from(records.len()).unwrap_or(i32::MAX))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(pending_sources.len())
}

/// Creates the base tables when missing.
///
/// # Errors
///
/// Returns an error if a DDL statement fails.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), SpaceCatError> {
    for statement in schema::CREATE_TABLES {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Creates the materialized views and their refresh function when missing.
///
/// # Errors
///
/// Returns an error if a DDL statement fails.
pub async fn ensure_views(pool: &PgPool) -> Result<(), SpaceCatError> {
    for statement in schema::create_views_statements() {
        sqlx::query(&statement).execute(pool).await?;
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the refresh function fails (e.g. views not created yet).
pub async fn refresh_views(pool: &PgPool) -> Result<(), SpaceCatError> {
    sqlx::query(&schema::refresh_statement())
        .execute(pool)
        .await?;
    info!("Brand presence views refreshed");
    Ok(())
}

/// Imports every brand-presence file of a site not imported yet.
///
/// # Errors
///
/// Returns an error on the first file that cannot be fetched or written;
/// files imported before it stay committed.
#[instrument(level = "info", skip(pool, cdn, options), fields(site_id = %options.site_id))]
pub async fn sync_site(
    pool: &PgPool,
    cdn: &CdnClient,
    options: &ImportOptions,
) -> Result<ImportSummary, SpaceCatError> {
    let classifier = SourceClassifier::new(&options.base_url, &options.competitors);
    let paths = cdn.list_paths(&options.data_folder).await?;
    let already = if options.dry_run && options.force {
        HashSet::new()
    } else {
        imported_paths(pool, &options.site_id).await?
    };

    let files = pending_files(&paths, &already, options.force);
    let mut summary = ImportSummary {
        files_found: paths
            .iter()
            .filter(|p| BrandPresenceFile::from_path(p).is_some())
            .count(),
        ..ImportSummary::default()
    };
    summary.files_skipped = summary.files_found.saturating_sub(files.len());
    info!(
        found = summary.files_found,
        pending = files.len(),
        "Brand presence files discovered"
    );

    for file in &files {
        let rows = cdn.fetch_all_rows(&file.path, None).await?;
        let records: Vec<BrandPresenceRecord> = rows
            .iter()
            .filter_map(|row| record_from_row(row, &options.site_id, file, &classifier))
            .collect();
        if records.len() < rows.len() {
            warn!(
                path = %file.path,
                skipped = rows.len() - records.len(),
                "Rows without a prompt skipped"
            );
        }

        if options.dry_run {
            info!(path = %file.path, records = records.len(), "Dry run, not writing");
            summary.sources += records.iter().map(|r| r.sources.len()).sum::<usize>();
        } else {
            summary.sources += write_file(pool, &options.site_id, file, &records).await?;
            info!(path = %file.path, records = records.len(), "File imported");
        }
        summary.records += records.len();
        summary.files_imported += 1;
    }

    if summary.files_imported > 0 && !options.dry_run {
        refresh_views(pool).await?;
    }

    Ok(summary)
}
