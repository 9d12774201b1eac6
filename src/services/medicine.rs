//! Medicine information lookup against the openFDA drug label API.
//!
//! Lookups try the brand name first, then the generic name. Found results are
//! cached in memory; misses are not, so a later label publication is picked up.

use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::MedicineConfig;

const NOT_AVAILABLE: &str = "Not available";
const SOURCE: &str = "OpenFDA";
const MAX_TEXT_CHARS: usize = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum MedicineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MedicineInfo {
    pub name: String,
    pub generic_name: String,
    pub brand_name: String,
    pub manufacturer: String,
    pub purpose: String,
    pub warnings: String,
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    #[serde(default)]
    openfda: OpenFda,
    #[serde(default)]
    purpose: Vec<String>,
    #[serde(default)]
    indications_and_usage: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenFda {
    #[serde(default)]
    brand_name: Vec<String>,
    #[serde(default)]
    generic_name: Vec<String>,
    #[serde(default)]
    manufacturer_name: Vec<String>,
}

fn first_or_default(values: &[String]) -> String {
    values
        .first()
        .map(|v| truncate(v.trim()))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl MedicineInfo {
    fn from_label(query: &str, label: Label) -> Self {
        let purpose = if label.purpose.is_empty() {
            first_or_default(&label.indications_and_usage)
        } else {
            first_or_default(&label.purpose)
        };
        let brand_name = first_or_default(&label.openfda.brand_name);
        let name = if brand_name == NOT_AVAILABLE {
            query.to_string()
        } else {
            brand_name.clone()
        };

        MedicineInfo {
            name,
            generic_name: first_or_default(&label.openfda.generic_name),
            brand_name,
            manufacturer: first_or_default(&label.openfda.manufacturer_name),
            purpose,
            warnings: first_or_default(&label.warnings),
            source: SOURCE.to_string(),
        }
    }
}

/// The name as it goes inside a quoted openFDA search phrase
fn search_term(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

pub struct MedicineClient {
    http: reqwest::Client,
    base_url: String,
    cache: Cache<String, MedicineInfo>,
}

impl MedicineClient {
    pub fn new(config: &MedicineConfig) -> Result<Self, MedicineError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// Look up a medicine by name. `Ok(None)` when openFDA has no label for it.
    #[tracing::instrument(name = "medicine::lookup", skip(self))]
    pub async fn lookup(&self, name: &str) -> Result<Option<MedicineInfo>, MedicineError> {
        let name = search_term(name);
        if name.is_empty() {
            return Ok(None);
        }
        let key = name.to_lowercase();

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Medicine cache hit");
            return Ok(Some(cached));
        }

        for field in ["openfda.brand_name", "openfda.generic_name"] {
            if let Some(label) = self.search(field, &name).await? {
                let info = MedicineInfo::from_label(&name, label);
                self.cache.insert(key, info.clone()).await;
                return Ok(Some(info));
            }
        }

        tracing::debug!("Medicine not found");
        Ok(None)
    }

    async fn search(&self, field: &str, name: &str) -> Result<Option<Label>, MedicineError> {
        let url = format!("{}/drug/label.json", self.base_url);
        let search = format!("{field}:\"{name}\"");

        let response = self
            .http
            .get(&url)
            .query(&[("search", search.as_str()), ("limit", "1")])
            .send()
            .await?;

        // openFDA answers 404 when nothing matches
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: LabelResponse = response.error_for_status()?.json().await?;
        Ok(body.results.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> MedicineClient {
        MedicineClient::new(&MedicineConfig {
            base_url: base_url.to_string(),
            ..MedicineConfig::default()
        })
        .unwrap()
    }

    fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": "NOT_FOUND", "message": "No matches found!" }
        }))
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "a".repeat(MAX_TEXT_CHARS + 10);
        let short = truncate(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.len(), MAX_TEXT_CHARS + 3);
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_lookup_by_brand_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param("search", "openfda.brand_name:\"Advil\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "openfda": {
                        "brand_name": ["Advil"],
                        "generic_name": ["IBUPROFEN"],
                        "manufacturer_name": ["Pfizer"]
                    },
                    "purpose": ["Pain reliever/fever reducer"],
                    "warnings": ["Allergy alert"]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let info = client.lookup("Advil").await.unwrap().unwrap();
        assert_eq!(info.generic_name, "IBUPROFEN");
        assert_eq!(info.manufacturer, "Pfizer");
        assert_eq!(info.source, "OpenFDA");

        // Second call is served from the cache; the mock expects one request
        let again = client.lookup("advil").await.unwrap().unwrap();
        assert_eq!(again, info);
    }

    #[tokio::test]
    async fn test_lookup_falls_back_to_generic_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("search", "openfda.brand_name:\"ibuprofen\""))
            .respond_with(not_found())
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("search", "openfda.generic_name:\"ibuprofen\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "openfda": { "generic_name": ["IBUPROFEN"] },
                    "indications_and_usage": ["Temporarily relieves minor aches"]
                }]
            })))
            .mount(&server)
            .await;

        let info = client(&server.uri()).lookup("ibuprofen").await.unwrap().unwrap();
        assert_eq!(info.name, "ibuprofen");
        assert_eq!(info.brand_name, NOT_AVAILABLE);
        assert_eq!(info.purpose, "Temporarily relieves minor aches");
        assert_eq!(info.warnings, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_medicine_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(not_found()).mount(&server).await;

        assert!(client(&server.uri()).lookup("zzzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_quotes_stripped_from_search_phrase() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("search", "openfda.brand_name:\"Advil\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "openfda": { "brand_name": ["Advil"] } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let info = client.lookup("Ad\"vil\\").await.unwrap().unwrap();
        assert_eq!(info.brand_name, "Advil");
        assert!(client.lookup(" \"\" ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(client(&server.uri()).lookup("aspirin").await.is_err());
    }
}
