use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CalendarRequest {
    pub url: String,
    pub realm: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn fetch_calendar(&self, request: &CalendarRequest) -> Result<String>;
}

// Fetches the CalDAV document with a single authenticated GET. reqwest
// sends the Basic credentials preemptively, so the realm is only carried
// for error reporting.
pub struct HttpCalendarSource;

impl HttpCalendarSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HttpCalendarSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarSource for HttpCalendarSource {
    async fn fetch_calendar(&self, request: &CalendarRequest) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(request.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let response = client
            .get(&request.url)
            .basic_auth(&request.username, Some(&request.password))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("timed out fetching {}", request.url))
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                realm: request.realm.clone(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(Error::Network(format!(
                "request to {} failed with status {}",
                request.url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }
}
