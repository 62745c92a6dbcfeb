use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DataAccess, DataResult};
use crate::core::models::{
    AsyncJob, Audit, Configuration, DeliveryType, JobStatus, NewSite, Organization, Site,
    SiteConfig, SiteTopPage, TrialUser, TrialUserStatus,
};
use crate::errors::SpaceCatError;

#[derive(Default)]
struct Tables {
    sites: HashMap<String, Site>,
    organizations: HashMap<String, Organization>,
    audits: Vec<Audit>,
    top_pages: Vec<SiteTopPage>,
    trial_users: Vec<TrialUser>,
    jobs: HashMap<String, AsyncJob>,
    configurations: Vec<Configuration>,
}

/// Process-local store. Nothing survives a cold start.
#[derive(Default)]
pub struct InMemoryDataAccess {
    tables: RwLock<Tables>,
}

impl InMemoryDataAccess {
    /// Records an audit. Audits are produced by the audit workers, so the
    /// service itself never writes them; this is the seeding entry point.
    pub async fn add_audit(&self, audit: Audit) {
        self.tables.write().await.audits.push(audit);
    }

    pub async fn add_top_page(&self, page: SiteTopPage) {
        self.tables.write().await.top_pages.push(page);
    }
}

fn sort_audits(audits: &mut [Audit], ascending: bool) {
    if ascending {
        audits.sort_by(|a, b| a.audited_at.cmp(&b.audited_at));
    } else {
        audits.sort_by(|a, b| b.audited_at.cmp(&a.audited_at));
    }
}

fn latest_per<K, F>(audits: &[Audit], key: F) -> Vec<Audit>
where
    K: std::hash::Hash + Eq,
    F: Fn(&Audit) -> K,
{
    let mut latest: HashMap<K, &Audit> = HashMap::new();
    for audit in audits {
        let entry = latest.entry(key(audit)).or_insert(audit);
        if audit.audited_at > entry.audited_at {
            *entry = audit;
        }
    }
    latest.into_values().cloned().collect()
}

#[async_trait]
impl DataAccess for InMemoryDataAccess {
    async fn all_sites(&self) -> DataResult<Vec<Site>> {
        let mut sites: Vec<Site> = self.tables.read().await.sites.values().cloned().collect();
        sites.sort_by(|a, b| a.base_url.cmp(&b.base_url));
        Ok(sites)
    }

    async fn sites_by_delivery_type(&self, delivery_type: DeliveryType) -> DataResult<Vec<Site>> {
        Ok(self
            .all_sites()
            .await?
            .into_iter()
            .filter(|s| s.delivery_type == delivery_type)
            .collect())
    }

    async fn site_by_id(&self, site_id: &str) -> DataResult<Option<Site>> {
        Ok(self.tables.read().await.sites.get(site_id).cloned())
    }

    async fn site_by_base_url(&self, base_url: &str) -> DataResult<Option<Site>> {
        Ok(self
            .tables
            .read()
            .await
            .sites
            .values()
            .find(|s| s.base_url == base_url)
            .cloned())
    }

    async fn create_site(&self, site: NewSite) -> DataResult<Site> {
        let mut tables = self.tables.write().await;
        if tables.sites.values().any(|s| s.base_url == site.base_url) {
            return Err(SpaceCatError::Conflict(format!(
                "Site with base URL {} already exists",
                site.base_url
            )));
        }
        let now = Utc::now();
        let created = Site {
            id: Uuid::new_v4().to_string(),
            base_url: site.base_url,
            name: site.name,
            delivery_type: site.delivery_type,
            organization_id: site.organization_id,
            is_live: site.is_live,
            git_hub_url: None,
            config: SiteConfig::default(),
            created_at: now,
            updated_at: now,
        };
        tables.sites.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_site(&self, site: &Site) -> DataResult<Site> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.sites.get_mut(&site.id) else {
            return Err(SpaceCatError::NotFound("Site not found".to_string()));
        };
        *stored = site.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn remove_site(&self, site_id: &str) -> DataResult<()> {
        let mut tables = self.tables.write().await;
        tables.sites.remove(site_id);
        tables.audits.retain(|a| a.site_id != site_id);
        tables.top_pages.retain(|p| p.site_id != site_id);
        Ok(())
    }

    async fn organization_by_id(&self, organization_id: &str) -> DataResult<Option<Organization>> {
        Ok(self
            .tables
            .read()
            .await
            .organizations
            .get(organization_id)
            .cloned())
    }

    async fn organization_by_ims_org_id(
        &self,
        ims_org_id: &str,
    ) -> DataResult<Option<Organization>> {
        Ok(self
            .tables
            .read()
            .await
            .organizations
            .values()
            .find(|o| o.ims_org_id.as_deref() == Some(ims_org_id))
            .cloned())
    }

    async fn create_organization(
        &self,
        name: &str,
        ims_org_id: Option<&str>,
    ) -> DataResult<Organization> {
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            ims_org_id: ims_org_id.map(ToString::to_string),
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .organizations
            .insert(org.id.clone(), org.clone());
        Ok(org)
    }

    async fn audits_for_site(&self, site_id: &str, ascending: bool) -> DataResult<Vec<Audit>> {
        let mut audits: Vec<Audit> = self
            .tables
            .read()
            .await
            .audits
            .iter()
            .filter(|a| a.site_id == site_id)
            .cloned()
            .collect();
        sort_audits(&mut audits, ascending);
        Ok(audits)
    }

    async fn audits_for_site_and_type(
        &self,
        site_id: &str,
        audit_type: &str,
        ascending: bool,
    ) -> DataResult<Vec<Audit>> {
        Ok(self
            .audits_for_site(site_id, ascending)
            .await?
            .into_iter()
            .filter(|a| a.audit_type == audit_type)
            .collect())
    }

    async fn latest_audits_for_site(&self, site_id: &str) -> DataResult<Vec<Audit>> {
        let audits = self.audits_for_site(site_id, false).await?;
        let mut latest = latest_per(&audits, |a| a.audit_type.clone());
        latest.sort_by(|a, b| a.audit_type.cmp(&b.audit_type));
        Ok(latest)
    }

    async fn latest_audit_for_site(
        &self,
        site_id: &str,
        audit_type: &str,
    ) -> DataResult<Option<Audit>> {
        Ok(self
            .audits_for_site_and_type(site_id, audit_type, false)
            .await?
            .into_iter()
            .next())
    }

    async fn latest_audits_by_type(
        &self,
        audit_type: &str,
        ascending: bool,
    ) -> DataResult<Vec<Audit>> {
        let audits: Vec<Audit> = self
            .tables
            .read()
            .await
            .audits
            .iter()
            .filter(|a| a.audit_type == audit_type)
            .cloned()
            .collect();
        let mut latest = latest_per(&audits, |a| a.site_id.clone());
        sort_audits(&mut latest, ascending);
        Ok(latest)
    }

    async fn top_pages_for_site(&self, site_id: &str) -> DataResult<Vec<SiteTopPage>> {
        let mut pages: Vec<SiteTopPage> = self
            .tables
            .read()
            .await
            .top_pages
            .iter()
            .filter(|p| p.site_id == site_id)
            .cloned()
            .collect();
        pages.sort_by(|a, b| b.traffic.cmp(&a.traffic));
        Ok(pages)
    }

    async fn trial_users_for_organization(
        &self,
        organization_id: &str,
    ) -> DataResult<Vec<TrialUser>> {
        Ok(self
            .tables
            .read()
            .await
            .trial_users
            .iter()
            .filter(|u| u.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn create_trial_user(
        &self,
        organization_id: &str,
        email_id: &str,
    ) -> DataResult<TrialUser> {
        let user = TrialUser {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            email_id: email_id.to_string(),
            status: TrialUserStatus::Invited,
            first_name: None,
            last_name: None,
            last_seen_at: None,
            created_at: Utc::now(),
        };
        self.tables.write().await.trial_users.push(user.clone());
        Ok(user)
    }

    async fn create_async_job(&self, job_type: &str, metadata: Value) -> DataResult<AsyncJob> {
        let now = Utc::now();
        let job = AsyncJob {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::InProgress,
            job_type: job_type.to_string(),
            metadata,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: Some(now),
            ended_at: None,
        };
        self.tables
            .write()
            .await
            .jobs
            .insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn async_job_by_id(&self, job_id: &str) -> DataResult<Option<AsyncJob>> {
        Ok(self.tables.read().await.jobs.get(job_id).cloned())
    }

    async fn update_async_job(&self, job: &AsyncJob) -> DataResult<AsyncJob> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.jobs.get_mut(&job.id) else {
            return Err(SpaceCatError::NotFound(format!(
                "Job with ID {} not found",
                job.id
            )));
        };
        *stored = job.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn latest_configuration(&self) -> DataResult<Configuration> {
        Ok(self
            .tables
            .read()
            .await
            .configurations
            .last()
            .cloned()
            .unwrap_or_default())
    }

    async fn save_configuration(&self, configuration: &Configuration) -> DataResult<Configuration> {
        let mut tables = self.tables.write().await;
        let version = tables.configurations.last().map_or(1, |c| c.version + 1);
        let mut saved = configuration.clone();
        saved.version = version;
        tables.configurations.push(saved.clone());
        Ok(saved)
    }
}
