use std::time::Duration as StdDuration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Client for the Strava-brokering service.
///
/// The broker owns the OAuth tokens; the core only asks "is this client
/// connected?" and hands over a file to upload on the client's behalf.
#[derive(Debug, Clone)]
pub struct StravaBrokerService {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ConnectionStatusResponse {
    connected: bool,
}

impl StravaBrokerService {
    pub fn new(base_url: String, timeout_seconds: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(timeout_seconds))
            .build()
            .map_err(AppError::Request)?;

        Ok(Self { client, base_url })
    }

    pub async fn is_connected(&self, client_id: i64) -> AppResult<bool> {
        let response = self
            .client
            .get(format!("{}/status/{}", self.base_url, client_id))
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::Strava(format!(
                "Connection status check failed for client {}: HTTP {}",
                client_id,
                response.status()
            )));
        }

        let body: ConnectionStatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::Strava(format!("Malformed status response: {}", e)))?;

        Ok(body.connected)
    }

    /// Upload an archived FIT file to the client's Strava account.
    pub async fn upload_activity(
        &self,
        client_id: i64,
        fit_bytes: Vec<u8>,
        name: &str,
        description: &str,
    ) -> AppResult<()> {
        let part = reqwest::multipart::Part::bytes(fit_bytes)
            .file_name("activity.fit")
            .mime_str("application/octet-stream")
            .map_err(AppError::Request)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("name", name.to_string())
            .text("description", description.to_string());

        let response = self
            .client
            .post(format!("{}/upload/{}", self.base_url, client_id))
            .multipart(form)
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::Strava(format!(
                "Upload failed for client {}: HTTP {}",
                client_id,
                response.status()
            )));
        }

        Ok(())
    }
}
