//! Nearby hospital search backed by the Google Places Nearby Search API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PlacesConfig;

const PLACE_TYPE: &str = "hospital";
const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1";
const MAPS_DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/?api=1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("places API key is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("places API returned {status}: {message}")]
    Api { status: String, message: String },
}

/// Search parameters posted by the dashboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub radius: Option<u32>,
    #[serde(default)]
    pub rankby: Option<String>,
    #[serde(default)]
    pub pagetoken: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Hospital {
    pub name: String,
    pub vicinity: Option<String>,
    pub rating: Option<f64>,
    pub total_ratings: u64,
    pub open_now: Option<bool>,
    pub place_id: String,
    pub maps_url: String,
    pub directions_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyHospitals {
    pub hospitals: Vec<Hospital>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    next_page_token: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: String,
    vicinity: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u64>,
    opening_hours: Option<OpeningHours>,
    #[serde(default)]
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    open_now: Option<bool>,
}

impl From<PlaceResult> for Hospital {
    fn from(place: PlaceResult) -> Self {
        let name = urlencoding::encode(&place.name).into_owned();
        let id = urlencoding::encode(&place.place_id).into_owned();
        Hospital {
            maps_url: format!("{MAPS_SEARCH_URL}&query={name}&query_place_id={id}"),
            directions_url: format!(
                "{MAPS_DIRECTIONS_URL}&destination={name}&destination_place_id={id}"
            ),
            name: place.name,
            vicinity: place.vicinity,
            rating: place.rating,
            total_ratings: place.user_ratings_total.unwrap_or(0),
            open_now: place.opening_hours.and_then(|h| h.open_now),
            place_id: place.place_id,
        }
    }
}

pub struct PlacesClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    default_radius: u32,
}

impl PlacesClient {
    pub fn new(config: &PlacesConfig) -> Result<Self, PlacesError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_radius: config.default_radius,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Query parameters for one Nearby Search call.
    ///
    /// A page token supersedes everything else; `rankby=distance` excludes radius.
    fn query_params(&self, request: &NearbyRequest, key: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![("key", key.to_string())];

        if let Some(token) = request.pagetoken.as_deref().filter(|t| !t.is_empty()) {
            params.push(("pagetoken", token.to_string()));
            return params;
        }

        params.push((
            "location",
            format!("{},{}", request.latitude, request.longitude),
        ));
        params.push(("type", PLACE_TYPE.to_string()));

        if request.rankby.as_deref() == Some("distance") {
            params.push(("rankby", "distance".to_string()));
        } else {
            let radius = request.radius.unwrap_or(self.default_radius);
            params.push(("radius", radius.to_string()));
        }

        params
    }

    #[tracing::instrument(name = "places::nearby", skip(self))]
    pub async fn nearby(&self, request: &NearbyRequest) -> Result<NearbyHospitals, PlacesError> {
        let key = self.api_key.as_deref().ok_or(PlacesError::NotConfigured)?;
        let url = format!("{}/nearbysearch/json", self.base_url);

        let response: NearbyResponse = self
            .http
            .get(&url)
            .query(&self.query_params(request, key))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            _ => {
                return Err(PlacesError::Api {
                    message: response.error_message.unwrap_or_default(),
                    status: response.status,
                })
            }
        }

        let hospitals: Vec<Hospital> = response.results.into_iter().map(Hospital::from).collect();
        tracing::debug!(count = hospitals.len(), "Nearby hospitals found");

        Ok(NearbyHospitals {
            hospitals,
            next_page_token: response.next_page_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, api_key: Option<&str>) -> PlacesClient {
        PlacesClient::new(&PlacesConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            default_radius: 5000,
        })
        .unwrap()
    }

    #[test]
    fn test_page_token_supersedes_location() {
        let client = client("http://localhost", Some("k"));
        let params = client.query_params(
            &NearbyRequest {
                pagetoken: Some("tok".into()),
                ..NearbyRequest::default()
            },
            "k",
        );
        assert!(params.iter().any(|(k, v)| *k == "pagetoken" && v == "tok"));
        assert!(!params.iter().any(|(k, _)| *k == "location"));
    }

    #[test]
    fn test_rank_by_distance_omits_radius() {
        let client = client("http://localhost", Some("k"));
        let params = client.query_params(
            &NearbyRequest {
                rankby: Some("distance".into()),
                ..NearbyRequest::default()
            },
            "k",
        );
        assert!(params.iter().any(|(k, _)| *k == "rankby"));
        assert!(!params.iter().any(|(k, _)| *k == "radius"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = client("http://localhost", None);
        assert!(!client.is_configured());
        let err = client.nearby(&NearbyRequest::default()).await.unwrap_err();
        assert!(matches!(err, PlacesError::NotConfigured));
    }

    #[tokio::test]
    async fn test_nearby_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearbysearch/json"))
            .and(query_param("type", "hospital"))
            .and(query_param("radius", "5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "results": [{
                    "name": "City Hospital",
                    "vicinity": "1 Main St",
                    "rating": 4.5,
                    "user_ratings_total": 120,
                    "opening_hours": { "open_now": true },
                    "place_id": "abc123"
                }],
                "next_page_token": "next"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server.uri(), Some("key"))
            .nearby(&NearbyRequest {
                latitude: 1.5,
                longitude: 2.5,
                ..NearbyRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(result.hospitals.len(), 1);
        let hospital = &result.hospitals[0];
        assert_eq!(hospital.name, "City Hospital");
        assert_eq!(hospital.total_ratings, 120);
        assert_eq!(hospital.open_now, Some(true));
        assert!(hospital.maps_url.contains("query=City%20Hospital"));
        assert!(hospital.directions_url.contains("destination_place_id=abc123"));
        assert_eq!(result.next_page_token.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn test_api_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearbysearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri(), Some("bad"))
            .nearby(&NearbyRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlacesError::Api { ref status, .. } if status == "REQUEST_DENIED"));
    }
}
