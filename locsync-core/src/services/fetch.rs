use std::{thread, time::Duration};

use log::{info, warn};
use rand::{thread_rng, Rng};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::cache::Endpoint;
use super::store::write_atomic;
use crate::config::{env_flag, SyncConfig, SKIP_API_REFRESH_ENV};
use crate::error::{Result, SyncError};

const MAX_RETRIES: usize = 3;
const BASE_DELAY_MS: u64 = 800;
const TIMEOUT_SECS: u64 = 60;

fn backoff(attempt: usize) -> Duration {
    let jitter: u64 = thread_rng().gen_range(0..200);
    let ms = BASE_DELAY_MS * (2_u64.pow(attempt as u32)) + jitter;
    Duration::from_millis(ms)
}

pub fn endpoint_url(base: &str, endpoint: Endpoint, lang: &str) -> String {
    format!("{}/{}?lang={lang}", base.trim_end_matches('/'), endpoint.as_str())
}

/// Downloads every endpoint in both languages into the cache directory.
///
/// Returns the number of files written; zero when `SKIP_API_REFRESH=1`.
pub fn refresh_cache(config: &SyncConfig) -> Result<usize> {
    if env_flag(SKIP_API_REFRESH_ENV) {
        info!("Skipping Daggerheart API data refresh (cached data).");
        return Ok(0);
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
        .map_err(|e| SyncError::Http {
            url: config.api_base_url.clone(),
            message: e.to_string(),
        })?;

    info!("Refreshing Daggerheart API cache...");
    let languages = [config.languages.target.as_str(), config.languages.source.as_str()];
    let mut written = 0;
    for endpoint in Endpoint::ALL {
        info!("  Fetching {} data from API...", endpoint.as_str());
        for lang in languages {
            let url = endpoint_url(&config.api_base_url, endpoint, lang);
            let body = fetch_with_retry(&client, &url)?;
            write_atomic(&config.cache_file(lang, endpoint.as_str()), &body)?;
            written += 1;
        }
    }
    Ok(written)
}

fn fetch_with_retry(client: &Client, url: &str) -> Result<Vec<u8>> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        match client.get(url).send() {
            Ok(resp) => {
                let status = resp.status();
                let bytes = match resp.bytes() {
                    Ok(b) => b,
                    Err(err) => {
                        last_err = err.to_string();
                        thread::sleep(backoff(attempt));
                        continue;
                    }
                };

                if status.is_success() {
                    return Ok(bytes.to_vec());
                }

                last_err = extract_error_message(status, &String::from_utf8_lossy(&bytes));
                if should_retry_http(status) && attempt + 1 < MAX_RETRIES {
                    warn!("{url}: {last_err}, retrying");
                    thread::sleep(backoff(attempt));
                    continue;
                }
                break;
            }
            Err(err) => {
                last_err = err.to_string();
                if attempt + 1 < MAX_RETRIES {
                    warn!("{url}: {last_err}, retrying");
                    thread::sleep(backoff(attempt));
                    continue;
                }
            }
        }
    }

    Err(SyncError::Http {
        url: url.to_string(),
        message: last_err,
    })
}

fn should_retry_http(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet = match trimmed.char_indices().nth(400) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    };

    format!("HTTP {}: {}", status.as_u16(), snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_the_api_layout() {
        assert_eq!(
            endpoint_url("https://daggerheart.su/api/", Endpoint::DomainCard, "ru"),
            "https://daggerheart.su/api/domain-card?lang=ru"
        );
    }

    #[test]
    fn only_transient_statuses_are_retried() {
        assert!(should_retry_http(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_http(StatusCode::BAD_GATEWAY));
        assert!(!should_retry_http(StatusCode::NOT_FOUND));
    }

    #[test]
    fn error_messages_prefer_json_fields() {
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, r#"{"error":{"message":"bad lang"}}"#),
            "HTTP 400: bad lang"
        );
        assert_eq!(
            extract_error_message(StatusCode::NOT_FOUND, r#"{"message":"no such endpoint"}"#),
            "HTTP 404: no such endpoint"
        );
        let long = "ж".repeat(500);
        let message = extract_error_message(StatusCode::BAD_GATEWAY, &long);
        assert!(message.ends_with("..."));
        assert_eq!(message.chars().filter(|c| *c == 'ж').count(), 400);
    }

    #[test]
    fn backoff_grows() {
        assert!(backoff(0) < Duration::from_millis(1000));
        assert!(backoff(2) >= Duration::from_millis(3200));
    }
}
