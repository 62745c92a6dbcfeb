//! Shared handles to the external collaborators, built once per cold start.

use std::sync::Arc;

use tracing::info;

use crate::aws::{AthenaQueryRunner, MessageQueue, ObjectStore, QueryRunner, S3ObjectStore, SqsQueue};
use crate::core::config::AppConfig;
use crate::data_access::{self, DataAccess};
use crate::errors::SpaceCatError;
use crate::slack::{SlackClient, SlackMessenger};

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub data_access: Arc<dyn DataAccess>,
    pub queue: Arc<dyn MessageQueue>,
    pub object_store: Arc<dyn ObjectStore>,
    pub query_runner: Arc<dyn QueryRunner>,
    pub slack: Arc<dyn SlackMessenger>,
}

impl AppContext {
    /// Wires the AWS, Slack and data-access clients for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if secrets cannot be resolved or the database is unreachable.
    pub async fn from_config(config: AppConfig) -> Result<Self, SpaceCatError> {
        let config = config.resolve_secrets().await?;
        let data_access = data_access::from_config(&config).await?;
        info!(
            postgres = config.database_url.is_some(),
            "Data access initialized"
        );

        Ok(Self {
            data_access,
            queue: Arc::new(SqsQueue::from_env().await),
            object_store: Arc::new(S3ObjectStore::from_env().await),
            query_runner: Arc::new(
                AthenaQueryRunner::from_env(config.athena_output_location.clone()).await,
            ),
            slack: Arc::new(SlackClient::new(config.slack_bot_token.clone())),
            config,
        })
    }
}
