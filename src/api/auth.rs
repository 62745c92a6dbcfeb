//! API key authentication and organization scoped access.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use super::request::Request;
use crate::core::config::AppConfig;
use crate::core::models::Site;
use crate::errors::SpaceCatError;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ORGANIZATION_IDS_HEADER: &str = "x-organization-ids";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Admin,
    /// Limited to the listed organizations.
    User { organization_ids: Vec<String> },
}

// Constant-time comparison through MAC verification.
fn keys_match(provided: &str, expected: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    mac.update(provided.as_bytes());
    let Ok(mut reference) = Hmac::<Sha256>::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    reference.update(expected.as_bytes());
    mac.verify_slice(&reference.finalize().into_bytes()).is_ok()
}

/// # Errors
///
/// Returns `Unauthorized` when the key is missing or unknown.
pub fn authenticate(request: &Request, config: &AppConfig) -> Result<Access, SpaceCatError> {
    let Some(key) = request.header(API_KEY_HEADER).filter(|k| !k.is_empty()) else {
        return Err(SpaceCatError::Unauthorized("Unauthorized".to_string()));
    };

    if keys_match(key, &config.admin_api_key) {
        return Ok(Access::Admin);
    }

    if let Some(user_key) = config.user_api_key.as_deref() {
        if keys_match(key, user_key) {
            let organization_ids = request
                .header(ORGANIZATION_IDS_HEADER)
                .unwrap_or("")
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string)
                .collect();
            return Ok(Access::User { organization_ids });
        }
    }

    warn!("Request with unknown API key");
    Err(SpaceCatError::Unauthorized("Unauthorized".to_string()))
}

impl Access {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Access::Admin)
    }

    /// # Errors
    ///
    /// Returns `Forbidden` with `message` for non-admins.
    pub fn require_admin(&self, message: &str) -> Result<(), SpaceCatError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(SpaceCatError::Forbidden(message.to_string()))
        }
    }

    #[must_use]
    pub fn can_access_organization(&self, organization_id: &str) -> bool {
        match self {
            Access::Admin => true,
            Access::User { organization_ids } => organization_ids.iter().any(|id| id == organization_id),
        }
    }

    /// Sites without an organization are only visible to admins.
    #[must_use]
    pub fn can_access_site(&self, site: &Site) -> bool {
        match &site.organization_id {
            Some(org) => self.can_access_organization(org),
            None => self.is_admin(),
        }
    }
}
