use std::time::Duration as StdDuration;

use reqwest::Client;

use crate::error::{AppError, AppResult};

/// Client for the Intervals.icu upload API. Authentication is the client's
/// own API key, stored on their record when they link the account.
#[derive(Debug, Clone)]
pub struct IntervalsService {
    client: Client,
    base_url: String,
}

impl IntervalsService {
    pub fn new(base_url: String, timeout_seconds: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(timeout_seconds))
            .build()
            .map_err(AppError::Request)?;

        Ok(Self { client, base_url })
    }

    /// Upload an archived FIT file using the athlete's API key.
    pub async fn upload_activity(
        &self,
        api_key: &str,
        fit_bytes: Vec<u8>,
        name: &str,
    ) -> AppResult<()> {
        let part = reqwest::multipart::Part::bytes(fit_bytes)
            .file_name("activity.fit")
            .mime_str("application/octet-stream")
            .map_err(AppError::Request)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("name", name.to_string());

        let response = self
            .client
            .post(format!("{}/api/v1/athlete/0/activities", self.base_url))
            .basic_auth("API_KEY", Some(api_key))
            .multipart(form)
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::Intervals(format!(
                "Upload failed: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}
