//! Reads spreadsheet-style JSON published on the LLMO data CDN.
//!
//! Sheets are served as `{ total, offset, limit, data: [...] }`; multi-sheet
//! documents nest one such object per sheet name under `:names`.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::errors::SpaceCatError;

pub const DEFAULT_CDN_BASE_URL: &str = "https://main--project-elmo-ui-data--adobe.aem.live";
pub const PAGE_SIZE: usize = 1000;
/// Guards against a sheet whose `total` never converges.
const MAX_PAGES: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct SheetPage {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

/// Extracts the page for `sheet` from a single or multi-sheet document.
///
/// # Errors
///
/// Returns an error if the document has neither shape.
pub fn parse_sheet_page(doc: &Value, sheet: Option<&str>) -> Result<SheetPage, SpaceCatError> {
    let node = if doc.get(":type").and_then(Value::as_str) == Some("multi-sheet") {
        let name = sheet
            .or_else(|| {
                doc.get(":names")
                    .and_then(Value::as_array)
                    .and_then(|n| n.first())
                    .and_then(Value::as_str)
            })
            .ok_or_else(|| SpaceCatError::ParseError("multi-sheet without :names".into()))?;
        doc.get(name)
            .ok_or_else(|| SpaceCatError::ParseError(format!("sheet {name} missing")))?
    } else {
        doc
    };

    if node.get("data").is_none() {
        return Err(SpaceCatError::ParseError("sheet has no data".into()));
    }
    Ok(serde_json::from_value(node.clone())?)
}

pub struct CdnClient {
    http: Client,
    base_url: String,
}

impl CdnClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, SpaceCatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn fetch_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, SpaceCatError> {
        let strategy = ExponentialBackoff::from_millis(250).map(jitter).take(3);
        Retry::start(strategy, || async {
            let resp = self.http.get(url).query(query).send().await?;
            let status = resp.status();
            if !status.is_success() {
                warn!(url = %url, status = %status, "CDN request failed");
                return Err(SpaceCatError::HttpError(format!("GET {url}: HTTP {status}")));
            }
            Ok(resp.json::<Value>().await?)
        })
        .await
    }

    /// Paths listed in `/{data_folder}/query-index.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be fetched or parsed.
    pub async fn list_paths(&self, data_folder: &str) -> Result<Vec<String>, SpaceCatError> {
        let rows = self
            .fetch_all_rows(&format!("{data_folder}/query-index.json"), None)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get("path").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect())
    }

    /// Every row of a sheet, following `offset`/`limit` pagination until `total`.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched or parsed.
    pub async fn fetch_all_rows(
        &self,
        path: &str,
        sheet: Option<&str>,
    ) -> Result<Vec<Map<String, Value>>, SpaceCatError> {
        let url = self.url_for(path);
        let mut rows: Vec<Map<String, Value>> = Vec::new();
        let mut offset = 0usize;

        for page_index in 0..MAX_PAGES {
            let mut query = vec![("offset", offset.to_string()), ("limit", PAGE_SIZE.to_string())];
            if let Some(name) = sheet {
                query.push(("sheet", name.to_string()));
            }
            let doc = self.fetch_json(&url, &query).await?;
            let page = parse_sheet_page(&doc, sheet)?;
            let fetched = page.data.len();
            debug!(url = %url, page_index, offset, fetched, total = page.total, "Fetched sheet page");
            rows.extend(page.data);

            offset += fetched;
            if fetched == 0 || offset >= page.total {
                info!(url = %url, rows = rows.len(), "Fetched sheet");
                return Ok(rows);
            }
        }

        Err(SpaceCatError::HttpError(format!(
            "{url}: gave up after {MAX_PAGES} pages"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_single_sheet() {
        let doc = json!({ "total": 2, "offset": 0, "limit": 2, "data": [{"a": "1"}, {"a": "2"}], ":type": "sheet" });
        let page = parse_sheet_page(&doc, None).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data.len(), 2);
    }

    #[test]
    fn parses_multi_sheet_default_and_named() {
        let doc = json!({
            ":type": "multi-sheet",
            ":names": ["all", "brand_vs_competitors"],
            "all": { "total": 1, "offset": 0, "limit": 1, "data": [{"Prompt": "p"}] },
            "brand_vs_competitors": { "total": 0, "offset": 0, "limit": 0, "data": [] }
        });
        assert_eq!(parse_sheet_page(&doc, None).unwrap().data.len(), 1);
        assert_eq!(
            parse_sheet_page(&doc, Some("brand_vs_competitors"))
                .unwrap()
                .data
                .len(),
            0
        );
        assert!(parse_sheet_page(&doc, Some("missing")).is_err());
    }

    #[test]
    fn rejects_documents_without_data() {
        assert!(parse_sheet_page(&json!({"total": 1}), None).is_err());
    }

    #[tokio::test]
    async fn gives_up_after_retries_on_unreachable_cdn() {
        let client = CdnClient::new("http://127.0.0.1:9").unwrap();
        let err = client.list_paths("adobe-com").await.unwrap_err();
        assert!(matches!(err, SpaceCatError::HttpError(_)), "{err:?}");
    }

    #[test]
    fn joins_paths() {
        let client = CdnClient::new("https://cdn.example.com/").unwrap();
        assert_eq!(
            client.url_for("/adobe-com/query-index.json"),
            "https://cdn.example.com/adobe-com/query-index.json"
        );
    }
}
