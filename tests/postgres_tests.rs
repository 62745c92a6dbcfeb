//! Tests against a real Postgres. They run only when `DATABASE_URL` is set;
//! each test works in its own freshly created schema.

mod common;

use serde_json::json;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use spacecat::brand_presence::import::{ensure_tables, ensure_views, imported_paths, refresh_views};
use spacecat::brand_presence::schema::{PROMPTS_VIEW, TOPICS_VIEW};
use spacecat::core::models::{DeliveryType, JobStatus, NewSite, TrialUserStatus};
use spacecat::data_access::{DataAccess, from_config};
use spacecat::errors::SpaceCatError;

use common::test_config;

/// URL of an empty schema on the test database, or `None` to skip.
async fn fresh_schema_url() -> Option<String> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres test");
        return None;
    };
    let schema = format!("spacecat_test_{}", uuid::Uuid::new_v4().simple());
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&admin)
        .await
        .unwrap();
    admin.close().await;

    let separator = if url.contains('?') { '&' } else { '?' };
    Some(format!("{url}{separator}options[search_path]={schema}"))
}

async fn pool_for(url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(url)
        .await
        .unwrap()
}

async fn insert_record(
    pool: &PgPool,
    prompt: &str,
    mentions: bool,
    visibility: f64,
    position: f64,
    sources: &[&str],
) {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO brand_presence (site_id, date, model, category, topic, prompt, mentions, \
         citations, visibility_score, position, source_file) \
         VALUES ('site-1', DATE '2025-03-03', 'chatgpt', 'cat', 'topic', $1, $2, $2, $3, $4, 'f.json') \
         RETURNING id",
    )
    .bind(prompt)
    .bind(mentions)
    .bind(visibility)
    .bind(position)
    .fetch_one(pool)
    .await
    .unwrap();

    for content_type in sources {
        sqlx::query(
            "INSERT INTO brand_presence_sources \
             (brand_presence_id, url, normalized_url, hostname, content_type) \
             VALUES ($1, 'https://a.com/x', 'a.com/x', 'a.com', $2)",
        )
        .bind(id)
        .bind(*content_type)
        .execute(pool)
        .await
        .unwrap();
    }
}

type Aggregates = (i64, i64, i64, f64, f64);

async fn aggregates(pool: &PgPool, view: &str) -> Aggregates {
    sqlx::query_as(&format!(
        "SELECT executions::bigint, mentions_count::bigint, citations_count::bigint, \
         avg_visibility_score::float8, avg_position::float8 FROM {view} WHERE site_id = 'site-1'"
    ))
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_prompt_view_counts_each_record_once() {
    let Some(url) = fresh_schema_url().await else {
        return;
    };
    let pool = pool_for(&url).await;
    ensure_tables(&pool).await.unwrap();
    ensure_views(&pool).await.unwrap();

    insert_record(&pool, "p1", true, 80.0, 1.0, &["owned", "earned", "earned"]).await;
    insert_record(&pool, "p1", false, 20.0, 5.0, &[]).await;
    refresh_views(&pool).await.unwrap();

    let topics = aggregates(&pool, TOPICS_VIEW).await;
    let prompts = aggregates(&pool, PROMPTS_VIEW).await;
    assert_eq!(topics, (2, 1, 1, 50.0, 3.0));
    assert_eq!(prompts, topics);

    let (owned, earned): (i64, i64) = sqlx::query_as(&format!(
        "SELECT owned_sources, earned_sources FROM {PROMPTS_VIEW} WHERE prompt = 'p1'"
    ))
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!((owned, earned), (1, 2));
}

#[tokio::test]
async fn test_views_can_be_ensured_twice() {
    let Some(url) = fresh_schema_url().await else {
        return;
    };
    let pool = pool_for(&url).await;
    ensure_tables(&pool).await.unwrap();
    ensure_views(&pool).await.unwrap();
    ensure_views(&pool).await.unwrap();
    refresh_views(&pool).await.unwrap();
}

#[tokio::test]
async fn test_missing_imports_table_means_nothing_imported() {
    let Some(url) = fresh_schema_url().await else {
        return;
    };
    let pool = pool_for(&url).await;

    assert!(imported_paths(&pool, "site-1").await.unwrap().is_empty());

    ensure_tables(&pool).await.unwrap();
    sqlx::query(
        "INSERT INTO brand_presence_imports (site_id, file_path, record_count) VALUES ('site-1', '/a.json', 3)",
    )
    .execute(&pool)
    .await
    .unwrap();
    let paths = imported_paths(&pool, "site-1").await.unwrap();
    assert!(paths.contains("/a.json"));
}

#[tokio::test]
async fn test_postgres_store_creates_its_tables_and_round_trips() {
    let Some(url) = fresh_schema_url().await else {
        return;
    };
    let mut config = test_config();
    config.database_url = Some(url);

    let store = from_config(&config).await.unwrap();
    // Starting again against the same database must not fail.
    from_config(&config).await.unwrap();

    let org = store
        .create_organization("Acme", Some("ACME123@AdobeOrg"))
        .await
        .unwrap();
    assert_eq!(
        store
            .organization_by_ims_org_id("ACME123@AdobeOrg")
            .await
            .unwrap()
            .map(|o| o.id),
        Some(org.id.clone())
    );

    let new_site = NewSite {
        base_url: "https://www.acme.com".to_string(),
        delivery_type: DeliveryType::AemCs,
        organization_id: Some(org.id.clone()),
        is_live: true,
        name: Some("Acme".to_string()),
    };
    let mut site = store.create_site(new_site.clone()).await.unwrap();
    assert!(matches!(
        store.create_site(new_site).await,
        Err(SpaceCatError::Conflict(_))
    ));

    site.git_hub_url = Some("https://github.com/acme/site".to_string());
    store.update_site(&site).await.unwrap();
    let loaded = store
        .site_by_base_url("https://www.acme.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, site.id);
    assert_eq!(loaded.delivery_type, DeliveryType::AemCs);
    assert_eq!(loaded.git_hub_url.as_deref(), Some("https://github.com/acme/site"));
    assert_eq!(
        store
            .sites_by_delivery_type(DeliveryType::AemCs)
            .await
            .unwrap()
            .len(),
        1
    );

    let mut configuration = store.latest_configuration().await.unwrap();
    configuration.enable_handler_for_site("cwv", &site.id);
    let saved = store.save_configuration(&configuration).await.unwrap();
    assert_eq!(saved.version, 1);
    let latest = store.latest_configuration().await.unwrap();
    assert!(latest.is_handler_enabled_for_site("cwv", &site.id));

    let user = store
        .create_trial_user(&org.id, "jane@acme.com")
        .await
        .unwrap();
    assert_eq!(user.status, TrialUserStatus::Invited);
    assert!(matches!(
        store.create_trial_user(&org.id, "jane@acme.com").await,
        Err(SpaceCatError::Conflict(_))
    ));

    let mut job = store
        .create_async_job("preflight", json!({ "payload": { "siteId": site.id } }))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::InProgress);
    job.status = JobStatus::Completed;
    job.result = Some(json!({ "ok": true }));
    store.update_async_job(&job).await.unwrap();
    let loaded = store.async_job_by_id(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Completed);
    assert_eq!(loaded.metadata["payload"]["siteId"], site.id);

    store.remove_site(&site.id).await.unwrap();
    assert!(store.site_by_id(&site.id).await.unwrap().is_none());
}
