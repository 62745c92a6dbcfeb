//! DDL for the brand-presence tables, materialized views and refresh function.

pub const TOPICS_VIEW: &str = "brand_presence_topics_by_date";
pub const PROMPTS_VIEW: &str = "brand_presence_prompts_by_date";
pub const REFRESH_FUNCTION: &str = "refresh_brand_presence_views";

pub const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS brand_presence (
        id BIGSERIAL PRIMARY KEY,
        site_id TEXT NOT NULL,
        date DATE NOT NULL,
        model TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        topic TEXT NOT NULL DEFAULT '',
        prompt TEXT NOT NULL,
        region TEXT NOT NULL DEFAULT 'US',
        origin TEXT NOT NULL DEFAULT 'human',
        volume BIGINT,
        mentions BOOLEAN NOT NULL DEFAULT FALSE,
        citations BOOLEAN NOT NULL DEFAULT FALSE,
        visibility_score DOUBLE PRECISION,
        position DOUBLE PRECISION,
        sentiment TEXT,
        answer TEXT,
        source_file TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS brand_presence_site_date_idx ON brand_presence (site_id, date)",
    "CREATE TABLE IF NOT EXISTS brand_presence_sources (
        id BIGSERIAL PRIMARY KEY,
        brand_presence_id BIGINT NOT NULL REFERENCES brand_presence (id) ON DELETE CASCADE,
        url TEXT NOT NULL,
        normalized_url TEXT NOT NULL,
        hostname TEXT NOT NULL,
        content_type TEXT NOT NULL
            CHECK (content_type IN ('owned', 'competitor', 'social', 'earned'))
    )",
    "CREATE INDEX IF NOT EXISTS brand_presence_sources_presence_idx ON brand_presence_sources (brand_presence_id)",
    "CREATE TABLE IF NOT EXISTS brand_presence_imports (
        site_id TEXT NOT NULL,
        file_path TEXT NOT NULL,
        record_count INTEGER NOT NULL,
        imported_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (site_id, file_path)
    )",
];

/// Materialized views, their unique indexes (required for concurrent
/// refresh) and the refresh function, in creation order.
#[must_use]
pub fn create_views_statements() -> Vec<String> {
    vec![
        format!(
            "CREATE MATERIALIZED VIEW IF NOT EXISTS {TOPICS_VIEW} AS
            SELECT
                bp.site_id,
                bp.date,
                bp.model,
                bp.category,
                bp.topic,
                bp.region,
                bp.origin,
                COUNT(*) AS executions,
                COUNT(DISTINCT bp.prompt) AS prompt_count,
                SUM(CASE WHEN bp.mentions THEN 1 ELSE 0 END) AS mentions_count,
                SUM(CASE WHEN bp.citations THEN 1 ELSE 0 END) AS citations_count,
                ROUND(AVG(bp.visibility_score)::numeric, 2) AS avg_visibility_score,
                ROUND(AVG(bp.position)::numeric, 2) AS avg_position,
                SUM(COALESCE(bp.volume, 0)) AS total_volume,
                SUM(CASE WHEN lower(bp.sentiment) = 'positive' THEN 1 ELSE 0 END) AS positive_count,
                SUM(CASE WHEN lower(bp.sentiment) = 'neutral' THEN 1 ELSE 0 END) AS neutral_count,
                SUM(CASE WHEN lower(bp.sentiment) = 'negative' THEN 1 ELSE 0 END) AS negative_count
            FROM brand_presence bp
            GROUP BY bp.site_id, bp.date, bp.model, bp.category, bp.topic, bp.region, bp.origin"
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {TOPICS_VIEW}_key ON {TOPICS_VIEW}
            (site_id, date, model, category, topic, region, origin)"
        ),
        format!(
            "CREATE MATERIALIZED VIEW IF NOT EXISTS {PROMPTS_VIEW} AS
            SELECT
                bp.site_id,
                bp.date,
                bp.model,
                bp.category,
                bp.topic,
                bp.prompt,
                bp.region,
                bp.origin,
                COUNT(*) AS executions,
                SUM(CASE WHEN bp.mentions THEN 1 ELSE 0 END) AS mentions_count,
                SUM(CASE WHEN bp.citations THEN 1 ELSE 0 END) AS citations_count,
                ROUND(AVG(bp.visibility_score)::numeric, 2) AS avg_visibility_score,
                ROUND(AVG(bp.position)::numeric, 2) AS avg_position,
                MAX(bp.volume) AS volume,
                SUM(COALESCE(src.owned, 0))::bigint AS owned_sources,
                SUM(COALESCE(src.competitor, 0))::bigint AS competitor_sources,
                SUM(COALESCE(src.social, 0))::bigint AS social_sources,
                SUM(COALESCE(src.earned, 0))::bigint AS earned_sources
            FROM brand_presence bp
            LEFT JOIN (
                SELECT
                    brand_presence_id,
                    COUNT(*) FILTER (WHERE content_type = 'owned') AS owned,
                    COUNT(*) FILTER (WHERE content_type = 'competitor') AS competitor,
                    COUNT(*) FILTER (WHERE content_type = 'social') AS social,
                    COUNT(*) FILTER (WHERE content_type = 'earned') AS earned
                FROM brand_presence_sources
                GROUP BY brand_presence_id
            ) src ON src.brand_presence_id = bp.id
            GROUP BY bp.site_id, bp.date, bp.model, bp.category, bp.topic, bp.prompt, bp.region, bp.origin"
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {PROMPTS_VIEW}_key ON {PROMPTS_VIEW}
            (site_id, date, model, category, topic, prompt, region, origin)"
        ),
        format!(
            "CREATE OR REPLACE FUNCTION {REFRESH_FUNCTION}() RETURNS void
            LANGUAGE plpgsql AS $$
            BEGIN
                REFRESH MATERIALIZED VIEW CONCURRENTLY {TOPICS_VIEW};
                REFRESH MATERIALIZED VIEW CONCURRENTLY {PROMPTS_VIEW};
            END;
            $$"
        ),
    ]
}

#[must_use]
pub fn drop_views_statements() -> Vec<String> {
    vec![
        format!("DROP FUNCTION IF EXISTS {REFRESH_FUNCTION}()"),
        format!("DROP MATERIALIZED VIEW IF EXISTS {PROMPTS_VIEW}"),
        format!("DROP MATERIALIZED VIEW IF EXISTS {TOPICS_VIEW}"),
    ]
}

#[must_use]
pub fn refresh_statement() -> String {
    format!("SELECT {REFRESH_FUNCTION}()")
}
