//! CurseForge HTTP client.
//!
//! Wraps the handful of CurseForge v1 endpoints the bot needs. Requests are
//! spaced by a minimum gap and HTTP 429 responses are retried a few times
//! before giving up.

use std::sync::LazyLock;
use std::time::Duration;

use backon::BackoffBuilder;
use fancy_regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serenity::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::common::error::{UpstreamError, UpstreamResult};
use crate::common::{ModId, ModInfo, Release};
use crate::config::types::CurseForgeConfig;
use crate::curseforge::changelog::html_to_markdown;
use crate::curseforge::types::{ApiFile, ApiMod, DataEnvelope};
use crate::curseforge::ReleaseSource;

/// Delay used when a 429 response carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Longest `Retry-After` honoured; anything above fails the request.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Number of 429 retries before a request fails.
const MAX_RATE_LIMIT_RETRIES: usize = 3;

static SERVER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)windowsserver\s+(\d+)\.zip").expect("version pattern is valid")
});

/// Client for the CurseForge v1 API.
pub struct CurseForgeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    game_id: u64,
    request_gap: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl CurseForgeClient {
    /// Create a client from configuration.
    pub fn new(config: &CurseForgeConfig) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("modherald/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            game_id: config.game_id,
            request_gap: config.request_gap,
            last_request: Mutex::new(None),
        })
    }

    /// Wait until at least `request_gap` has passed since the previous request.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_gap {
                let wait = self.request_gap - elapsed;
                debug!("Rate limiting in effect, sleeping {:?}", wait);
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET an endpoint and decode the `data` envelope.
    async fn get_data<T: DeserializeOwned>(&self, endpoint: &str) -> UpstreamResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut backoff = rate_limit_backoff();
        let mut attempts = 0;

        loop {
            self.pace().await;
            attempts += 1;
            debug!("GET {}", url);

            let response = self
                .http
                .get(&url)
                .header(ACCEPT, "application/json")
                .header("x-api-key", &self.api_key)
                .send()
                .await?;

            let status = response.status();
            debug!("CurseForge responded {} for {}", status, endpoint);

            if status == StatusCode::TOO_MANY_REQUESTS {
                let Some(fallback) = backoff.next() else {
                    return Err(UpstreamError::RateLimited { attempts });
                };
                let delay = retry_after(response.headers()).unwrap_or(fallback);
                if delay > MAX_RETRY_AFTER {
                    warn!(
                        "CurseForge asked to retry after {:?}, giving up until the next cycle",
                        delay
                    );
                    return Err(UpstreamError::RateLimited { attempts });
                }
                warn!(
                    "CurseForge rate limit exceeded, retrying in {:.1}s",
                    delay.as_secs_f64()
                );
                sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.bytes().await?;
            let envelope: DataEnvelope<T> = serde_json::from_slice(&body)?;
            return Ok(envelope.data);
        }
    }
}

#[async_trait]
impl ReleaseSource for CurseForgeClient {
    async fn latest_release(&self, mod_id: ModId) -> UpstreamResult<Option<Release>> {
        let files: Vec<ApiFile> = self
            .get_data(&format!(
                "/mods/{}/files?gameId={}&orderBy=dateCreated&sortOrder=desc",
                mod_id, self.game_id
            ))
            .await?;

        let Some(latest) = files.into_iter().next() else {
            debug!("No files found for mod {}", mod_id);
            return Ok(None);
        };

        Ok(Some(Release {
            id: latest.id.to_string(),
            mod_id,
            version: extract_version(&latest.display_name),
            file_name: latest.file_name,
            published_at: latest.file_date,
            download_url: latest.download_url.filter(|url| !url.is_empty()),
        }))
    }

    async fn mod_info(&self, mod_id: ModId) -> UpstreamResult<ModInfo> {
        let info: ApiMod = self.get_data(&format!("/mods/{}", mod_id)).await?;

        Ok(ModInfo {
            id: info.id,
            name: info.name,
            slug: info.slug,
            logo_url: info.logo.and_then(|logo| logo.url).filter(|url| !url.is_empty()),
        })
    }

    async fn changelog(&self, mod_id: ModId, release_id: &str) -> UpstreamResult<Option<String>> {
        let html: Option<String> = self
            .get_data(&format!("/mods/{}/files/{}/changelog", mod_id, release_id))
            .await?;

        Ok(html
            .map(|html| html_to_markdown(&html))
            .filter(|text| !text.is_empty()))
    }
}

/// Backoff used for 429 responses that carry no `Retry-After`.
fn rate_limit_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(DEFAULT_RETRY_AFTER)
        .with_max_delay(DEFAULT_RETRY_AFTER)
        .with_factor(1.0)
        .with_max_times(MAX_RATE_LIMIT_RETRIES)
        .build()
}

/// Parse a `Retry-After` header given in seconds.
///
/// Values too large for a `Duration` saturate to `Duration::MAX`.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
}

/// Extract the server build number from a display name such as
/// `"WindowsServer 1234.zip"`, falling back to the whole name.
pub fn extract_version(display_name: &str) -> String {
    SERVER_VERSION
        .captures(display_name)
        .ok()
        .flatten()
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .unwrap_or_else(|| display_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> CurseForgeConfig {
        CurseForgeConfig {
            api_key: "test-key".to_string(),
            base_url,
            game_id: 828326,
            game_slug: "ark-survival-ascended".to_string(),
            mod_ids: vec![101],
            request_gap: Duration::ZERO,
        }
    }

    fn files_json() -> serde_json::Value {
        serde_json::json!({
            "data": [
                {
                    "id": 5551,
                    "displayName": "WindowsServer 1234.zip",
                    "fileName": "server-1234.zip",
                    "fileDate": "2024-03-15T10:00:00Z",
                    "downloadUrl": "https://edge.forgecdn.net/files/5551/server-1234.zip",
                    "gameVersions": ["1.0"]
                },
                {
                    "id": 5550,
                    "displayName": "WindowsServer 1233.zip",
                    "fileName": "server-1233.zip",
                    "fileDate": "2024-03-10T10:00:00Z",
                    "downloadUrl": null
                }
            ],
            "pagination": { "index": 0, "pageSize": 50, "resultCount": 2, "totalCount": 2 }
        })
    }

    #[test]
    fn test_extract_version() {
        assert_eq!(extract_version("WindowsServer 1234.zip"), "1234");
        assert_eq!(extract_version("windowsserver   77.ZIP"), "77");
        assert_eq!(extract_version("Cool Mod v1.2"), "Cool Mod v1.2");
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, "1e30".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::MAX));
    }

    #[test]
    fn test_rate_limit_backoff_is_constant() {
        let delays: Vec<Duration> = rate_limit_backoff().collect();
        assert_eq!(delays, vec![DEFAULT_RETRY_AFTER; MAX_RATE_LIMIT_RETRIES]);
    }

    #[tokio::test]
    async fn test_latest_release() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files"))
            .and(query_param("gameId", "828326"))
            .and(query_param("orderBy", "dateCreated"))
            .and(query_param("sortOrder", "desc"))
            .and(header("x-api-key", "test-key"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(files_json()))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let release = client.latest_release(101).await.unwrap().unwrap();

        assert_eq!(release.id, "5551");
        assert_eq!(release.mod_id, 101);
        assert_eq!(release.version, "1234");
        assert_eq!(release.file_name, "server-1234.zip");
        assert_eq!(
            release.download_url.as_deref(),
            Some("https://edge.forgecdn.net/files/5551/server-1234.zip")
        );
        assert_eq!(release.published_at.to_rfc3339(), "2024-03-15T10:00:00+00:00");
    }

    #[tokio::test]
    async fn test_missing_download_url_is_none() {
        let mock_server = MockServer::start().await;

        let body = serde_json::json!({
            "data": [{
                "id": 77,
                "displayName": "Some Mod 2.0",
                "fileName": "some-mod-2.0.zip",
                "fileDate": "2024-03-15T10:00:00Z",
                "downloadUrl": null
            }]
        });

        Mock::given(method("GET"))
            .and(path("/mods/101/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let release = client.latest_release(101).await.unwrap().unwrap();

        assert_eq!(release.version, "Some Mod 2.0");
        assert_eq!(release.id, "77");
        assert_eq!(release.download_url, None);
    }

    #[tokio::test]
    async fn test_no_files_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/202/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let release = assert_ok!(client.latest_release(202).await);
        assert!(release.is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let err = assert_err!(client.latest_release(101).await);

        let UpstreamError::Status { status, message } = err else {
            panic!("Expected Status error");
        };
        assert_eq!(status, 403);
        assert_eq!(message, "Forbidden");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_upstream_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let err = assert_err!(client.latest_release(101).await);
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(files_json()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let release = client.latest_release(101).await.unwrap();
        assert_eq!(release.map(|r| r.id), Some("5551".to_string()));
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let err = assert_err!(client.latest_release(101).await);
        assert!(matches!(
            err,
            UpstreamError::RateLimited { attempts } if attempts == MAX_RATE_LIMIT_RETRIES + 1
        ));
    }

    #[tokio::test]
    async fn test_excessive_retry_after_fails_fast() {
        for retry_after in ["1e30", "86400"] {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/mods/101/files"))
                .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", retry_after))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
            let err = assert_err!(client.latest_release(101).await);
            assert!(matches!(err, UpstreamError::RateLimited { attempts: 1 }));
        }
    }

    #[tokio::test]
    async fn test_mod_info() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": 101,
                    "name": "Super Structures",
                    "slug": "super-structures",
                    "logo": { "id": 1, "url": "https://media.forgecdn.net/logo.png" },
                    "downloadCount": 123456
                }
            })))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let info = client.mod_info(101).await.unwrap();

        assert_eq!(info.id, 101);
        assert_eq!(info.name, "Super Structures");
        assert_eq!(info.slug, "super-structures");
        assert_eq!(info.logo_url.as_deref(), Some("https://media.forgecdn.net/logo.png"));
    }

    #[tokio::test]
    async fn test_changelog_is_converted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files/5551/changelog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": "<ul><li>Fixed&nbsp;crash</li></ul>"
            })))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        let changelog = client.changelog(101, "5551").await.unwrap();
        assert_eq!(changelog.as_deref(), Some("- Fixed crash"));
    }

    #[tokio::test]
    async fn test_empty_changelog_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mods/101/files/5551/changelog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": "<p></p>" })))
            .mount(&mock_server)
            .await;

        let client = CurseForgeClient::new(&test_config(mock_server.uri())).unwrap();
        assert_eq!(client.changelog(101, "5551").await.unwrap(), None);
    }
}
