use std::env;

use aws_sdk_ssm::Client as SsmClient;
use tracing::info;

use crate::errors::SpaceCatError;

const SSM_PREFIX: &str = "ssm:";

pub const DEFAULT_API_BASE_URL: &str = "https://spacecat.experiencecloud.live/api/v1";
pub const DEFAULT_ATHENA_DATABASE: &str = "rum_metrics";
pub const DEFAULT_ATHENA_TABLE: &str = "compact_metrics";
pub const DEFAULT_PRESIGNED_URL_TTL_SECONDS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack_signing_secret: String,
    pub slack_bot_token: String,
    pub audit_jobs_queue_url: String,
    pub import_worker_queue_url: String,
    pub scraping_jobs_queue_url: String,
    pub admin_api_key: String,
    pub user_api_key: Option<String>,
    pub database_url: Option<String>,
    pub s3_scraper_bucket: String,
    pub s3_cache_bucket: String,
    pub athena_database: String,
    pub athena_table: String,
    pub athena_output_location: Option<String>,
    pub api_base_url: String,
    pub presigned_url_ttl_seconds: u64,
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|e| format!("{name}: {e}"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let s3_scraper_bucket = required("S3_SCRAPER_BUCKET")?;
        let presigned_url_ttl_seconds = match optional("PRESIGNED_URL_TTL_SECONDS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("PRESIGNED_URL_TTL_SECONDS: {e}"))?,
            None => DEFAULT_PRESIGNED_URL_TTL_SECONDS,
        };

        Ok(Self {
            slack_signing_secret: required("SLACK_SIGNING_SECRET")?,
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            audit_jobs_queue_url: required("AUDIT_JOBS_QUEUE_URL")?,
            import_worker_queue_url: required("IMPORT_WORKER_QUEUE_URL")?,
            scraping_jobs_queue_url: required("SCRAPING_JOBS_QUEUE_URL")?,
            admin_api_key: required("ADMIN_API_KEY")?,
            user_api_key: optional("USER_API_KEY"),
            database_url: optional("DATABASE_URL"),
            s3_cache_bucket: optional("S3_CACHE_BUCKET").unwrap_or_else(|| s3_scraper_bucket.clone()),
            s3_scraper_bucket,
            athena_database: optional("ATHENA_DATABASE")
                .unwrap_or_else(|| DEFAULT_ATHENA_DATABASE.to_string()),
            athena_table: optional("ATHENA_TABLE").unwrap_or_else(|| DEFAULT_ATHENA_TABLE.to_string()),
            athena_output_location: optional("ATHENA_OUTPUT_LOCATION"),
            api_base_url: optional("API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            presigned_url_ttl_seconds,
        })
    }

    /// Replaces `ssm:<name>` secret values with their SSM Parameter Store value.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced parameter cannot be read.
    pub async fn resolve_secrets(mut self) -> Result<Self, SpaceCatError> {
        let needs_ssm = [
            Some(&self.slack_bot_token),
            Some(&self.slack_signing_secret),
            Some(&self.admin_api_key),
            self.user_api_key.as_ref(),
        ]
        .into_iter()
        .flatten()
        .any(|v| v.starts_with(SSM_PREFIX));

        if !needs_ssm {
            return Ok(self);
        }

        let shared = aws_config::from_env().load().await;
        let client = SsmClient::new(&shared);

        self.slack_bot_token = resolve_value(&client, self.slack_bot_token).await?;
        self.slack_signing_secret = resolve_value(&client, self.slack_signing_secret).await?;
        self.admin_api_key = resolve_value(&client, self.admin_api_key).await?;
        if let Some(key) = self.user_api_key.take() {
            self.user_api_key = Some(resolve_value(&client, key).await?);
        }

        Ok(self)
    }
}

async fn resolve_value(client: &SsmClient, value: String) -> Result<String, SpaceCatError> {
    let Some(name) = value.strip_prefix(SSM_PREFIX) else {
        return Ok(value);
    };

    info!(parameter = %name, "Resolving secret from SSM");
    let resp = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await?;

    resp.parameter
        .and_then(|p| p.value)
        .ok_or_else(|| SpaceCatError::Config(format!("SSM parameter {name} has no value")))
}
