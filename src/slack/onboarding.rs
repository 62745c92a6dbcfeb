//! LLMO onboarding of a site, as submitted through the onboarding modal.

use tracing::{info, instrument};

use super::modal_builder::OnboardRequest;
use crate::aws::messages::{AuditMessage, SlackContext};
use crate::aws::sqs::to_message;
use crate::context::AppContext;
use crate::core::models::{LlmoConfig, NewSite, Organization, Site};
use crate::errors::SpaceCatError;
use crate::slack::commands::backfill_llmo::LLMO_CUSTOMER_ANALYSIS_AUDIT;
use crate::utils::validation::llmo_data_folder;

/// Audits switched on for every onboarded site.
pub const LLMO_AUDITS: &[&str] = &[LLMO_CUSTOMER_ANALYSIS_AUDIT, "geo-brand-presence"];

async fn find_or_create_organization(
    app: &AppContext,
    request: &OnboardRequest,
) -> Result<Organization, SpaceCatError> {
    if let Some(org) = app
        .data_access
        .organization_by_ims_org_id(&request.ims_org_id)
        .await?
    {
        return Ok(org);
    }
    let org = app
        .data_access
        .create_organization(&request.brand_name, Some(&request.ims_org_id))
        .await?;
    info!(organization_id = %org.id, ims_org_id = %request.ims_org_id, "Organization created");
    Ok(org)
}

async fn find_or_create_site(
    app: &AppContext,
    request: &OnboardRequest,
    organization: &Organization,
) -> Result<Site, SpaceCatError> {
    if let Some(site) = app.data_access.site_by_base_url(&request.base_url).await? {
        return Ok(site);
    }
    let site = app
        .data_access
        .create_site(NewSite {
            base_url: request.base_url.clone(),
            delivery_type: request.delivery_type,
            organization_id: Some(organization.id.clone()),
            is_live: true,
            name: Some(request.brand_name.clone()),
        })
        .await?;
    info!(site_id = %site.id, base_url = %site.base_url, "Site created");
    Ok(site)
}

/// Creates or updates the organization and site, stores the LLMO settings,
/// enables the LLMO audits and queues the first analysis.
///
/// # Errors
///
/// Returns an error if any store or queue operation fails.
#[instrument(level = "info", skip(app, request, slack), fields(base_url = %request.base_url))]
pub async fn onboard_llmo(
    app: &AppContext,
    request: &OnboardRequest,
    slack: Option<&SlackContext>,
) -> Result<Site, SpaceCatError> {
    let data_folder = llmo_data_folder(&request.base_url)
        .ok_or_else(|| SpaceCatError::Validation(format!("Invalid base URL {}", request.base_url)))?;

    let organization = find_or_create_organization(app, request).await?;
    let mut site = find_or_create_site(app, request, &organization).await?;

    if site.organization_id.is_none() {
        site.organization_id = Some(organization.id.clone());
    }
    site.config.llmo = Some(LlmoConfig {
        data_folder,
        brand: request.brand_name.clone(),
        competitors: request.competitors.clone(),
    });
    let site = app.data_access.update_site(&site).await?;

    let mut configuration = app.data_access.latest_configuration().await?;
    for audit in LLMO_AUDITS {
        configuration.enable_handler_for_site(audit, &site.id);
    }
    app.data_access.save_configuration(&configuration).await?;

    let message = AuditMessage::new(LLMO_CUSTOMER_ANALYSIS_AUDIT, &site.id).with_slack_context(slack);
    app.queue
        .send_message(&app.config.audit_jobs_queue_url, &to_message(&message)?)
        .await?;
    info!(site_id = %site.id, "LLMO onboarding complete");

    Ok(site)
}

#[must_use]
pub fn confirmation_text(site: &Site) -> String {
    let folder = site
        .config
        .llmo
        .as_ref()
        .map_or("", |l| l.data_folder.as_str());
    format!(
        ":white_check_mark: *{}* is onboarded to LLMO.\n• Site ID: `{}`\n• Data folder: `{folder}`\n• Enabled audits: {}\nThe first {LLMO_CUSTOMER_ANALYSIS_AUDIT} audit is on its way.",
        site.base_url,
        site.id,
        LLMO_AUDITS.join(", ")
    )
}
