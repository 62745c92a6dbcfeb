#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{Value, json};

use spacecat::api::signature::compute_signature;
use spacecat::aws::{MessageQueue, ObjectStore, QueryRunner, Row};
use spacecat::context::AppContext;
use spacecat::core::config::AppConfig;
use spacecat::core::models::{DeliveryType, NewSite, Organization, Site};
use spacecat::data_access::{DataAccess, InMemoryDataAccess};
use spacecat::errors::SpaceCatError;
use spacecat::slack::SlackMessenger;

pub const ADMIN_KEY: &str = "admin-key";
pub const USER_KEY: &str = "user-key";
pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const AUDIT_QUEUE: &str = "https://sqs.test/audit-jobs";
pub const IMPORT_QUEUE: &str = "https://sqs.test/import-jobs";
pub const SCRAPING_QUEUE: &str = "https://sqs.test/scraping-jobs";
pub const SCRAPER_BUCKET: &str = "scraper-bucket";
pub const CACHE_BUCKET: &str = "cache-bucket";

pub fn test_config() -> AppConfig {
    AppConfig {
        slack_signing_secret: SIGNING_SECRET.to_string(),
        slack_bot_token: "xoxb-test".to_string(),
        audit_jobs_queue_url: AUDIT_QUEUE.to_string(),
        import_worker_queue_url: IMPORT_QUEUE.to_string(),
        scraping_jobs_queue_url: SCRAPING_QUEUE.to_string(),
        admin_api_key: ADMIN_KEY.to_string(),
        user_api_key: Some(USER_KEY.to_string()),
        database_url: None,
        s3_scraper_bucket: SCRAPER_BUCKET.to_string(),
        s3_cache_bucket: CACHE_BUCKET.to_string(),
        athena_database: "rum_metrics".to_string(),
        athena_table: "compact_metrics".to_string(),
        athena_output_location: None,
        api_base_url: "https://api.test/api/v1".to_string(),
        presigned_url_ttl_seconds: 600,
    }
}

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
pub struct RecordingQueue {
    pub sent: Mutex<Vec<(String, Value)>>,
    pub fail: bool,
}

impl RecordingQueue {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn messages_for(&self, queue_url: &str) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _)| q == queue_url)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl MessageQueue for RecordingQueue {
    async fn send_message(&self, queue_url: &str, message: &Value) -> Result<(), SpaceCatError> {
        if self.fail {
            return Err(SpaceCatError::AwsError("queue unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((queue_url.to_string(), message.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, SpaceCatError> {
        Ok(self.contains(bucket, key))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, SpaceCatError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), SpaceCatError> {
        self.insert(bucket, key, &body);
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, SpaceCatError> {
        Ok(format!(
            "https://{bucket}.s3.test/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}

#[derive(Default)]
pub struct CannedQueryRunner {
    pub rows: Vec<Row>,
    pub queries: Mutex<Vec<(String, String)>>,
}

impl CannedQueryRunner {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            queries: Mutex::default(),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryRunner for CannedQueryRunner {
    async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>, SpaceCatError> {
        self.queries
            .lock()
            .unwrap()
            .push((sql.to_string(), database.to_string()));
        Ok(self.rows.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub channel_id: String,
    pub thread_ts: Option<String>,
    pub text: String,
    pub blocks: Option<Value>,
}

#[derive(Default)]
pub struct RecordingSlack {
    pub posted: Mutex<Vec<PostedMessage>>,
    pub modals: Mutex<Vec<(String, Value)>>,
}

impl RecordingSlack {
    pub fn texts(&self) -> Vec<String> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn last_text(&self) -> String {
        self.texts().pop().unwrap_or_default()
    }
}

#[async_trait]
impl SlackMessenger for RecordingSlack {
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        text: &str,
        blocks: Option<&Value>,
    ) -> Result<(), SpaceCatError> {
        self.posted.lock().unwrap().push(PostedMessage {
            channel_id: channel_id.to_string(),
            thread_ts: thread_ts.map(ToString::to_string),
            text: text.to_string(),
            blocks: blocks.cloned(),
        });
        Ok(())
    }

    async fn open_modal(&self, trigger_id: &str, view: &Value) -> Result<(), SpaceCatError> {
        self.modals
            .lock()
            .unwrap()
            .push((trigger_id.to_string(), view.clone()));
        Ok(())
    }
}

/// An [`AppContext`] wired to in-memory fakes, with handles kept for assertions.
pub struct TestApp {
    pub app: AppContext,
    pub data: Arc<InMemoryDataAccess>,
    pub queue: Arc<RecordingQueue>,
    pub store: Arc<MemoryObjectStore>,
    pub athena: Arc<CannedQueryRunner>,
    pub slack: Arc<RecordingSlack>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(RecordingQueue::default(), CannedQueryRunner::default())
    }

    pub fn with_parts(queue: RecordingQueue, athena: CannedQueryRunner) -> Self {
        let data = Arc::new(InMemoryDataAccess::default());
        let queue = Arc::new(queue);
        let store = Arc::new(MemoryObjectStore::default());
        let athena = Arc::new(athena);
        let slack = Arc::new(RecordingSlack::default());
        let app = AppContext {
            config: test_config(),
            data_access: data.clone(),
            queue: queue.clone(),
            object_store: store.clone(),
            query_runner: athena.clone(),
            slack: slack.clone(),
        };
        Self {
            app,
            data,
            queue,
            store,
            athena,
            slack,
        }
    }

    pub async fn organization(&self, name: &str) -> Organization {
        self.data
            .create_organization(name, Some(&format!("{}@AdobeOrg", name.to_uppercase())))
            .await
            .unwrap()
    }

    pub async fn job(&self, job_id: &str) -> Value {
        let job = self.data.async_job_by_id(job_id).await.unwrap().unwrap();
        serde_json::to_value(job).unwrap()
    }

    pub async fn site(&self, base_url: &str, organization_id: Option<&str>) -> Site {
        self.data
            .create_site(NewSite {
                base_url: base_url.to_string(),
                delivery_type: DeliveryType::AemEdge,
                organization_id: organization_id.map(ToString::to_string),
                is_live: true,
                name: None,
            })
            .await
            .unwrap()
    }
}

// ============================================================================
// API Gateway events
// ============================================================================

pub fn event(method: &str, path: &str, key: Option<&str>, body: Option<Value>) -> Value {
    let mut headers = serde_json::Map::new();
    if let Some(key) = key {
        headers.insert("x-api-key".to_string(), json!(key));
    }
    json!({
        "httpMethod": method,
        "path": format!("/api/v1{path}"),
        "headers": headers,
        "queryStringParameters": null,
        "body": body.map(|b| b.to_string()),
        "isBase64Encoded": false
    })
}

pub fn event_with_query(
    method: &str,
    path: &str,
    key: Option<&str>,
    query: &[(&str, &str)],
) -> Value {
    let mut event = event(method, path, key, None);
    let params: BTreeMap<&str, &str> = query.iter().copied().collect();
    event["queryStringParameters"] = json!(params);
    event
}

/// A user-key request scoped to `organization_ids`.
pub fn user_event(method: &str, path: &str, organization_ids: &[&str], body: Option<Value>) -> Value {
    let mut event = event(method, path, Some(USER_KEY), body);
    event["headers"]["x-organization-ids"] = json!(organization_ids.join(","));
    event
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// A Slack request to `path` signed with [`SIGNING_SECRET`].
pub fn slack_event(path: &str, body: &str) -> Value {
    let timestamp = now_secs().to_string();
    let signature = compute_signature(&timestamp, body, SIGNING_SECRET);
    json!({
        "httpMethod": "POST",
        "path": path,
        "headers": {
            "X-Slack-Signature": signature,
            "X-Slack-Request-Timestamp": timestamp,
            "Content-Type": "application/json"
        },
        "body": body,
        "isBase64Encoded": false
    })
}

pub fn status(response: &Value) -> u64 {
    response["statusCode"].as_u64().unwrap()
}

pub fn body(response: &Value) -> Value {
    let raw = response["body"].as_str().unwrap_or("");
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap()
}
