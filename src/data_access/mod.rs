//! Abstractions over the data-access layer.
//!
//! Controllers and Slack commands only ever talk to [`DataAccess`]; the
//! concrete store is chosen at startup (`DATABASE_URL` selects Postgres,
//! otherwise records live in memory).

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::AppConfig;
use crate::core::models::{
    AsyncJob, Audit, Configuration, DeliveryType, NewSite, Organization, Site, SiteTopPage,
    TrialUser,
};
use crate::errors::SpaceCatError;

pub use memory::InMemoryDataAccess;
pub use postgres::PgDataAccess;

pub type DataResult<T> = Result<T, SpaceCatError>;

#[async_trait]
pub trait DataAccess: Send + Sync {
    // Sites

    async fn all_sites(&self) -> DataResult<Vec<Site>>;

    async fn sites_by_delivery_type(&self, delivery_type: DeliveryType) -> DataResult<Vec<Site>>;

    async fn site_by_id(&self, site_id: &str) -> DataResult<Option<Site>>;

    /// Lookup by normalized base URL.
    async fn site_by_base_url(&self, base_url: &str) -> DataResult<Option<Site>>;

    async fn create_site(&self, site: NewSite) -> DataResult<Site>;

    /// Persists every mutable field of `site` and bumps `updated_at`.
    async fn update_site(&self, site: &Site) -> DataResult<Site>;

    async fn remove_site(&self, site_id: &str) -> DataResult<()>;

    // Organizations

    async fn organization_by_id(&self, organization_id: &str) -> DataResult<Option<Organization>>;

    async fn organization_by_ims_org_id(&self, ims_org_id: &str)
    -> DataResult<Option<Organization>>;

    async fn create_organization(
        &self,
        name: &str,
        ims_org_id: Option<&str>,
    ) -> DataResult<Organization>;

    // Audits

    /// Audits ordered by `audited_at`, newest first unless `ascending`.
    async fn audits_for_site(&self, site_id: &str, ascending: bool) -> DataResult<Vec<Audit>>;

    async fn audits_for_site_and_type(
        &self,
        site_id: &str,
        audit_type: &str,
        ascending: bool,
    ) -> DataResult<Vec<Audit>>;

    /// The most recent audit of each type for a site.
    async fn latest_audits_for_site(&self, site_id: &str) -> DataResult<Vec<Audit>>;

    async fn latest_audit_for_site(
        &self,
        site_id: &str,
        audit_type: &str,
    ) -> DataResult<Option<Audit>>;

    /// The most recent audit of `audit_type` for every site, ordered by `audited_at`.
    async fn latest_audits_by_type(&self, audit_type: &str, ascending: bool)
    -> DataResult<Vec<Audit>>;

    // Top pages

    async fn top_pages_for_site(&self, site_id: &str) -> DataResult<Vec<SiteTopPage>>;

    // Trial users

    async fn trial_users_for_organization(&self, organization_id: &str)
    -> DataResult<Vec<TrialUser>>;

    async fn create_trial_user(&self, organization_id: &str, email_id: &str)
    -> DataResult<TrialUser>;

    // Async jobs

    async fn create_async_job(
        &self,
        job_type: &str,
        metadata: serde_json::Value,
    ) -> DataResult<AsyncJob>;

    async fn async_job_by_id(&self, job_id: &str) -> DataResult<Option<AsyncJob>>;

    async fn update_async_job(&self, job: &AsyncJob) -> DataResult<AsyncJob>;

    // Configuration

    async fn latest_configuration(&self) -> DataResult<Configuration>;

    /// Stores `configuration` as a new version and returns it.
    async fn save_configuration(&self, configuration: &Configuration)
    -> DataResult<Configuration>;
}

/// Builds the store selected by configuration.
///
/// # Errors
///
/// Returns an error if the Postgres pool cannot be created or its tables
/// cannot be created.
pub async fn from_config(config: &AppConfig) -> DataResult<Arc<dyn DataAccess>> {
    match &config.database_url {
        Some(url) => {
            let store = PgDataAccess::connect(url).await?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryDataAccess::default())),
    }
}
