use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_athena::Client as AthenaClient;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use tracing::{debug, info, instrument};

use crate::errors::SpaceCatError;

/// One result row keyed by column name.
pub type Row = BTreeMap<String, String>;

const MAX_POLLS: u32 = 60;
const INITIAL_POLL_DELAY_MS: u64 = 200;
const MAX_POLL_DELAY_MS: u64 = 2_000;

#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>, SpaceCatError>;
}

pub struct AthenaQueryRunner {
    client: AthenaClient,
    output_location: Option<String>,
}

impl AthenaQueryRunner {
    #[must_use]
    pub fn new(client: AthenaClient, output_location: Option<String>) -> Self {
        Self {
            client,
            output_location,
        }
    }

    pub async fn from_env(output_location: Option<String>) -> Self {
        let shared_config = aws_config::from_env().load().await;
        Self::new(AthenaClient::new(&shared_config), output_location)
    }

    async fn wait_for_completion(&self, execution_id: &str) -> Result<(), SpaceCatError> {
        let mut delay = INITIAL_POLL_DELAY_MS;
        for poll in 0..MAX_POLLS {
            let resp = self
                .client
                .get_query_execution()
                .query_execution_id(execution_id)
                .send()
                .await?;
            let status = resp.query_execution().and_then(|q| q.status());
            let state = status.and_then(|s| s.state());

            match state {
                Some(QueryExecutionState::Succeeded) => {
                    debug!(execution_id, poll, "Athena query succeeded");
                    return Ok(());
                }
                Some(QueryExecutionState::Failed | QueryExecutionState::Cancelled) => {
                    let reason = status
                        .and_then(|s| s.state_change_reason())
                        .unwrap_or("unknown reason");
                    return Err(SpaceCatError::AwsError(format!(
                        "Athena query {execution_id} did not succeed: {reason}"
                    )));
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_POLL_DELAY_MS);
                }
            }
        }

        Err(SpaceCatError::AwsError(format!(
            "Athena query {execution_id} timed out after {MAX_POLLS} polls"
        )))
    }
}

#[async_trait]
impl QueryRunner for AthenaQueryRunner {
    #[instrument(level = "info", skip(self, sql))]
    async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>, SpaceCatError> {
        let mut request = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(QueryExecutionContext::builder().database(database).build());
        if let Some(location) = &self.output_location {
            request = request.result_configuration(
                ResultConfiguration::builder()
                    .output_location(location)
                    .build(),
            );
        }

        let started = request.send().await?;
        let execution_id = started
            .query_execution_id()
            .ok_or_else(|| SpaceCatError::AwsError("Athena returned no execution id".into()))?
            .to_string();
        info!(execution_id = %execution_id, "Athena query started");

        self.wait_for_completion(&execution_id).await?;

        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .get_query_results()
                .query_execution_id(&execution_id)
                .set_next_token(next_token.take())
                .send()
                .await?;

            if let Some(result_set) = page.result_set() {
                for row in result_set.rows() {
                    let values: Vec<String> = row
                        .data()
                        .iter()
                        .map(|d| d.var_char_value().unwrap_or_default().to_string())
                        .collect();
                    // The first row of the first page repeats the column names.
                    if headers.is_empty() {
                        headers = values;
                        continue;
                    }
                    rows.push(headers.iter().cloned().zip(values).collect());
                }
            }

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        info!(execution_id = %execution_id, rows = rows.len(), "Athena query results fetched");
        Ok(rows)
    }
}
