use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::errors::SpaceCatError;

/// SQS accepts at most ten entries per `SendMessageBatch` call.
pub const SQS_BATCH_LIMIT: usize = 10;

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send_message(&self, queue_url: &str, message: &Value) -> Result<(), SpaceCatError>;

    /// Sends `messages` in batches of [`SQS_BATCH_LIMIT`].
    async fn send_message_batch(
        &self,
        queue_url: &str,
        messages: &[Value],
    ) -> Result<(), SpaceCatError> {
        for message in messages {
            self.send_message(queue_url, message).await?;
        }
        Ok(())
    }
}

/// Serializes a typed message contract for [`MessageQueue`].
///
/// # Errors
///
/// Returns an error if the message cannot be represented as JSON.
pub fn to_message<T: Serialize>(message: &T) -> Result<Value, SpaceCatError> {
    serde_json::to_value(message)
        .map_err(|e| SpaceCatError::General(format!("Failed to serialize message: {e}")))
}

pub struct SqsQueue {
    client: SqsClient,
}

impl SqsQueue {
    #[must_use]
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let shared_config = aws_config::from_env().load().await;
        Self::new(SqsClient::new(&shared_config))
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send_message(&self, queue_url: &str, message: &Value) -> Result<(), SpaceCatError> {
        let message_body = serde_json::to_string(message)
            .map_err(|e| SpaceCatError::General(format!("Failed to serialize message: {e}")))?;

        let resp = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(message_body)
            .send()
            .await
            .map_err(|e| SpaceCatError::AwsError(format!("Failed to send message to SQS: {e}")))?;

        debug!(
            queue_url = %queue_url,
            message_id = resp.message_id().unwrap_or_default(),
            "Message sent"
        );
        Ok(())
    }

    async fn send_message_batch(
        &self,
        queue_url: &str,
        messages: &[Value],
    ) -> Result<(), SpaceCatError> {
        for (chunk_index, chunk) in messages.chunks(SQS_BATCH_LIMIT).enumerate() {
            let entries = chunk
                .iter()
                .enumerate()
                .map(|(i, message)| {
                    let body = serde_json::to_string(message).map_err(|e| {
                        SpaceCatError::General(format!("Failed to serialize message: {e}"))
                    })?;
                    SendMessageBatchRequestEntry::builder()
                        .id(format!("msg-{i}"))
                        .message_body(body)
                        .build()
                        .map_err(|e| SpaceCatError::AwsError(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let resp = self
                .client
                .send_message_batch()
                .queue_url(queue_url)
                .set_entries(Some(entries))
                .send()
                .await
                .map_err(|e| {
                    SpaceCatError::AwsError(format!("Failed to send message batch to SQS: {e}"))
                })?;

            let failed = resp.failed();
            if !failed.is_empty() {
                let ids: Vec<&str> = failed.iter().map(|f| f.id()).collect();
                error!(queue_url = %queue_url, chunk_index, failed = ?ids, "Batch entries rejected");
                return Err(SpaceCatError::AwsError(format!(
                    "{} of {} messages were rejected by SQS",
                    failed.len(),
                    chunk.len()
                )));
            }
        }

        info!(queue_url = %queue_url, count = messages.len(), "Message batch sent");
        Ok(())
    }
}
