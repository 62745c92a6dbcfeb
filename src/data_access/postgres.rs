//! Postgres-backed [`DataAccess`].
//!
//! Nested structures (site config, audit results, job metadata) live in
//! JSONB columns; everything else is a plain column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{DataAccess, DataResult};
use crate::core::models::{
    AsyncJob, Audit, AuditToggle, Configuration, DeliveryType, JobError, NewSite, Organization,
    Site, SiteConfig, SiteTopPage, TrialUser, TrialUserStatus,
};
use crate::errors::SpaceCatError;

pub type DbPool = PgPool;

/// Tables used by [`PgDataAccess`], created idempotently by [`PgDataAccess::ensure_schema`].
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS organizations (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        ims_org_id TEXT UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS sites (
        id TEXT PRIMARY KEY,
        base_url TEXT NOT NULL UNIQUE,
        name TEXT,
        delivery_type TEXT NOT NULL,
        organization_id TEXT REFERENCES organizations (id),
        is_live BOOLEAN NOT NULL DEFAULT FALSE,
        git_hub_url TEXT,
        config JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS audits (
        id TEXT PRIMARY KEY,
        site_id TEXT NOT NULL REFERENCES sites (id) ON DELETE CASCADE,
        audit_type TEXT NOT NULL,
        audited_at TIMESTAMPTZ NOT NULL,
        full_audit_ref TEXT NOT NULL DEFAULT '',
        is_live BOOLEAN NOT NULL DEFAULT FALSE,
        is_error BOOLEAN NOT NULL DEFAULT FALSE,
        audit_result JSONB NOT NULL DEFAULT '{}'::jsonb
    )",
    "CREATE INDEX IF NOT EXISTS audits_site_type_idx ON audits (site_id, audit_type, audited_at DESC)",
    "CREATE TABLE IF NOT EXISTS site_top_pages (
        site_id TEXT NOT NULL REFERENCES sites (id) ON DELETE CASCADE,
        url TEXT NOT NULL,
        traffic BIGINT NOT NULL DEFAULT 0,
        source TEXT NOT NULL DEFAULT 'ahrefs',
        geo TEXT NOT NULL DEFAULT 'global',
        PRIMARY KEY (site_id, url, source, geo)
    )",
    "CREATE TABLE IF NOT EXISTS trial_users (
        id TEXT PRIMARY KEY,
        organization_id TEXT NOT NULL REFERENCES organizations (id),
        email_id TEXT NOT NULL,
        status TEXT NOT NULL,
        first_name TEXT,
        last_name TEXT,
        last_seen_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (organization_id, email_id)
    )",
    "CREATE TABLE IF NOT EXISTS async_jobs (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        job_type TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        result JSONB,
        error JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        started_at TIMESTAMPTZ,
        ended_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS configurations (
        version INTEGER PRIMARY KEY,
        enabled_audits JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
];

#[derive(FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    ims_org_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            ims_org_id: row.ims_org_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SiteRow {
    id: String,
    base_url: String,
    name: Option<String>,
    delivery_type: String,
    organization_id: Option<String>,
    is_live: bool,
    git_hub_url: Option<String>,
    config: Json<SiteConfig>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SiteRow> for Site {
    type Error = SpaceCatError;

    fn try_from(row: SiteRow) -> Result<Self, Self::Error> {
        Ok(Site {
            id: row.id,
            base_url: row.base_url,
            name: row.name,
            delivery_type: row
                .delivery_type
                .parse()
                .map_err(SpaceCatError::DataAccess)?,
            organization_id: row.organization_id,
            is_live: row.is_live,
            git_hub_url: row.git_hub_url,
            config: row.config.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: String,
    site_id: String,
    audit_type: String,
    audited_at: DateTime<Utc>,
    full_audit_ref: String,
    is_live: bool,
    is_error: bool,
    audit_result: Json<Value>,
}

impl From<AuditRow> for Audit {
    fn from(row: AuditRow) -> Self {
        Audit {
            id: row.id,
            site_id: row.site_id,
            audit_type: row.audit_type,
            audited_at: row.audited_at,
            full_audit_ref: row.full_audit_ref,
            is_live: row.is_live,
            is_error: row.is_error,
            audit_result: row.audit_result.0,
        }
    }
}

#[derive(FromRow)]
struct TopPageRow {
    site_id: String,
    url: String,
    traffic: i64,
    source: String,
    geo: String,
}

#[derive(FromRow)]
struct TrialUserRow {
    id: String,
    organization_id: String,
    email_id: String,
    status: String,
    first_name: Option<String>,
    last_name: Option<String>,
    last_seen_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TrialUserRow> for TrialUser {
    type Error = SpaceCatError;

    fn try_from(row: TrialUserRow) -> Result<Self, Self::Error> {
        Ok(TrialUser {
            id: row.id,
            organization_id: row.organization_id,
            email_id: row.email_id,
            status: row
                .status
                .parse::<TrialUserStatus>()
                .map_err(SpaceCatError::DataAccess)?,
            first_name: row.first_name,
            last_name: row.last_name,
            last_seen_at: row.last_seen_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AsyncJobRow {
    id: String,
    status: String,
    job_type: String,
    metadata: Json<Value>,
    result: Option<Json<Value>>,
    error: Option<Json<JobError>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl TryFrom<AsyncJobRow> for AsyncJob {
    type Error = SpaceCatError;

    fn try_from(row: AsyncJobRow) -> Result<Self, Self::Error> {
        Ok(AsyncJob {
            id: row.id,
            status: row.status.parse().map_err(SpaceCatError::DataAccess)?,
            job_type: row.job_type,
            metadata: row.metadata.0,
            result: row.result.map(|r| r.0),
            error: row.error.map(|e| e.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            ended_at: row.ended_at,
        })
    }
}

#[derive(FromRow)]
struct ConfigurationRow {
    version: i32,
    enabled_audits: Json<std::collections::BTreeMap<String, AuditToggle>>,
}

fn conflict_or(error: sqlx::Error, message: String) -> SpaceCatError {
    match &error {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            SpaceCatError::Conflict(message)
        }
        _ => SpaceCatError::from(error),
    }
}

const SITE_COLUMNS: &str = "id, base_url, name, delivery_type, organization_id, is_live, \
                            git_hub_url, config, created_at, updated_at";
const AUDIT_COLUMNS: &str =
    "id, site_id, audit_type, audited_at, full_audit_ref, is_live, is_error, audit_result";
const JOB_COLUMNS: &str = "id, status, job_type, metadata, result, error, created_at, \
                           updated_at, started_at, ended_at";

pub struct PgDataAccess {
    pool: DbPool,
}

impl PgDataAccess {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns an error if the pool cannot connect.
    pub async fn connect(database_url: &str) -> DataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    #[instrument(level = "info", skip(self))]
    pub async fn ensure_schema(&self) -> DataResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!(statements = SCHEMA.len(), "Data access schema ensured");
        Ok(())
    }

    async fn sites_where(&self, clause: &str, arg: Option<&str>) -> DataResult<Vec<Site>> {
        let sql = format!("SELECT {SITE_COLUMNS} FROM sites {clause} ORDER BY base_url");
        let mut query = sqlx::query_as::<_, SiteRow>(&sql);
        if let Some(arg) = arg {
            query = query.bind(arg);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Site::try_from)
            .collect()
    }

    async fn one_site_where(&self, clause: &str, arg: &str) -> DataResult<Option<Site>> {
        Ok(self.sites_where(clause, Some(arg)).await?.into_iter().next())
    }
}

fn order(ascending: bool) -> &'static str {
    if ascending { "ASC" } else { "DESC" }
}

#[async_trait]
impl DataAccess for PgDataAccess {
    async fn all_sites(&self) -> DataResult<Vec<Site>> {
        self.sites_where("", None).await
    }

    async fn sites_by_delivery_type(&self, delivery_type: DeliveryType) -> DataResult<Vec<Site>> {
        self.sites_where("WHERE delivery_type = $1", Some(delivery_type.as_str()))
            .await
    }

    async fn site_by_id(&self, site_id: &str) -> DataResult<Option<Site>> {
        self.one_site_where("WHERE id = $1", site_id).await
    }

    async fn site_by_base_url(&self, base_url: &str) -> DataResult<Option<Site>> {
        self.one_site_where("WHERE base_url = $1", base_url).await
    }

    async fn create_site(&self, site: NewSite) -> DataResult<Site> {
        let sql = format!(
            "INSERT INTO sites (id, base_url, name, delivery_type, organization_id, is_live, config) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {SITE_COLUMNS}"
        );
        let base_url = site.base_url.clone();
        let row = sqlx::query_as::<_, SiteRow>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&site.base_url)
            .bind(&site.name)
            .bind(site.delivery_type.as_str())
            .bind(&site.organization_id)
            .bind(site.is_live)
            .bind(Json(SiteConfig::default()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or(e, format!("Site with base URL {base_url} already exists")))?;
        Site::try_from(row)
    }

    async fn update_site(&self, site: &Site) -> DataResult<Site> {
        let sql = format!(
            "UPDATE sites SET name = $2, delivery_type = $3, organization_id = $4, is_live = $5, \
             git_hub_url = $6, config = $7, updated_at = now() WHERE id = $1 RETURNING {SITE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SiteRow>(&sql)
            .bind(&site.id)
            .bind(&site.name)
            .bind(site.delivery_type.as_str())
            .bind(&site.organization_id)
            .bind(site.is_live)
            .bind(&site.git_hub_url)
            .bind(Json(&site.config))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SpaceCatError::NotFound("Site not found".to_string()))?;
        Site::try_from(row)
    }

    async fn remove_site(&self, site_id: &str) -> DataResult<()> {
        sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn organization_by_id(&self, organization_id: &str) -> DataResult<Option<Organization>> {
        Ok(sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, ims_org_id, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Organization::from))
    }

    async fn organization_by_ims_org_id(
        &self,
        ims_org_id: &str,
    ) -> DataResult<Option<Organization>> {
        Ok(sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, ims_org_id, created_at, updated_at FROM organizations WHERE ims_org_id = $1",
        )
        .bind(ims_org_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Organization::from))
    }

    async fn create_organization(
        &self,
        name: &str,
        ims_org_id: Option<&str>,
    ) -> DataResult<Organization> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "INSERT INTO organizations (id, name, ims_org_id) VALUES ($1, $2, $3) \
             RETURNING id, name, ims_org_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(ims_org_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "Organization already exists".to_string()))?;
        Ok(row.into())
    }

    async fn audits_for_site(&self, site_id: &str, ascending: bool) -> DataResult<Vec<Audit>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audits WHERE site_id = $1 ORDER BY audited_at {}",
            order(ascending)
        );
        Ok(sqlx::query_as::<_, AuditRow>(&sql)
            .bind(site_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Audit::from)
            .collect())
    }

    async fn audits_for_site_and_type(
        &self,
        site_id: &str,
        audit_type: &str,
        ascending: bool,
    ) -> DataResult<Vec<Audit>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audits WHERE site_id = $1 AND audit_type = $2 \
             ORDER BY audited_at {}",
            order(ascending)
        );
        Ok(sqlx::query_as::<_, AuditRow>(&sql)
            .bind(site_id)
            .bind(audit_type)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Audit::from)
            .collect())
    }

    async fn latest_audits_for_site(&self, site_id: &str) -> DataResult<Vec<Audit>> {
        let sql = format!(
            "SELECT DISTINCT ON (audit_type) {AUDIT_COLUMNS} FROM audits WHERE site_id = $1 \
             ORDER BY audit_type, audited_at DESC"
        );
        Ok(sqlx::query_as::<_, AuditRow>(&sql)
            .bind(site_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Audit::from)
            .collect())
    }

    async fn latest_audit_for_site(
        &self,
        site_id: &str,
        audit_type: &str,
    ) -> DataResult<Option<Audit>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audits WHERE site_id = $1 AND audit_type = $2 \
             ORDER BY audited_at DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, AuditRow>(&sql)
            .bind(site_id)
            .bind(audit_type)
            .fetch_optional(&self.pool)
            .await?
            .map(Audit::from))
    }

    async fn latest_audits_by_type(
        &self,
        audit_type: &str,
        ascending: bool,
    ) -> DataResult<Vec<Audit>> {
        let sql = format!(
            "SELECT * FROM (SELECT DISTINCT ON (site_id) {AUDIT_COLUMNS} FROM audits \
             WHERE audit_type = $1 ORDER BY site_id, audited_at DESC) latest \
             ORDER BY audited_at {}",
            order(ascending)
        );
        Ok(sqlx::query_as::<_, AuditRow>(&sql)
            .bind(audit_type)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Audit::from)
            .collect())
    }

    async fn top_pages_for_site(&self, site_id: &str) -> DataResult<Vec<SiteTopPage>> {
        let rows = sqlx::query_as::<_, TopPageRow>(
            "SELECT site_id, url, traffic, source, geo FROM site_top_pages WHERE site_id = $1 \
             ORDER BY traffic DESC",
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| SiteTopPage {
                site_id: r.site_id,
                url: r.url,
                traffic: u64::try_from(r.traffic).unwrap_or(0),
                source: r.source,
                geo: r.geo,
            })
            .collect())
    }

    async fn trial_users_for_organization(
        &self,
        organization_id: &str,
    ) -> DataResult<Vec<TrialUser>> {
        sqlx::query_as::<_, TrialUserRow>(
            "SELECT id, organization_id, email_id, status, first_name, last_name, last_seen_at, \
             created_at FROM trial_users WHERE organization_id = $1 ORDER BY created_at",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TrialUser::try_from)
        .collect()
    }

    async fn create_trial_user(
        &self,
        organization_id: &str,
        email_id: &str,
    ) -> DataResult<TrialUser> {
        let row = sqlx::query_as::<_, TrialUserRow>(
            "INSERT INTO trial_users (id, organization_id, email_id, status) VALUES ($1, $2, $3, $4) \
             RETURNING id, organization_id, email_id, status, first_name, last_name, last_seen_at, created_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(organization_id)
        .bind(email_id)
        .bind(TrialUserStatus::Invited.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "Trial user with this email already exists".to_string()))?;
        TrialUser::try_from(row)
    }

    async fn create_async_job(&self, job_type: &str, metadata: Value) -> DataResult<AsyncJob> {
        let sql = format!(
            "INSERT INTO async_jobs (id, status, job_type, metadata, started_at) \
             VALUES ($1, 'IN_PROGRESS', $2, $3, now()) RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AsyncJobRow>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(job_type)
            .bind(Json(metadata))
            .fetch_one(&self.pool)
            .await?;
        AsyncJob::try_from(row)
    }

    async fn async_job_by_id(&self, job_id: &str) -> DataResult<Option<AsyncJob>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM async_jobs WHERE id = $1");
        sqlx::query_as::<_, AsyncJobRow>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .map(AsyncJob::try_from)
            .transpose()
    }

    async fn update_async_job(&self, job: &AsyncJob) -> DataResult<AsyncJob> {
        let sql = format!(
            "UPDATE async_jobs SET status = $2, metadata = $3, result = $4, error = $5, \
             started_at = $6, ended_at = $7, updated_at = now() WHERE id = $1 RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AsyncJobRow>(&sql)
            .bind(&job.id)
            .bind(job.status.as_str())
            .bind(Json(&job.metadata))
            .bind(job.result.as_ref().map(Json))
            .bind(job.error.as_ref().map(Json))
            .bind(job.started_at)
            .bind(job.ended_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SpaceCatError::NotFound(format!("Job with ID {} not found", job.id)))?;
        AsyncJob::try_from(row)
    }

    async fn latest_configuration(&self) -> DataResult<Configuration> {
        let row = sqlx::query_as::<_, ConfigurationRow>(
            "SELECT version, enabled_audits FROM configurations ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or_else(Configuration::default, |r| Configuration {
            version: u32::try_from(r.version).unwrap_or(0),
            enabled_audits: r.enabled_audits.0,
        }))
    }

    async fn save_configuration(&self, configuration: &Configuration) -> DataResult<Configuration> {
        let row = sqlx::query_as::<_, ConfigurationRow>(
            "INSERT INTO configurations (version, enabled_audits) \
             VALUES ((SELECT COALESCE(MAX(version), 0) + 1 FROM configurations), $1) \
             RETURNING version, enabled_audits",
        )
        .bind(Json(&configuration.enabled_audits))
        .fetch_one(&self.pool)
        .await?;
        Ok(Configuration {
            version: u32::try_from(row.version).unwrap_or(0),
            enabled_audits: row.enabled_audits.0,
        })
    }
}
