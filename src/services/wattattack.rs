use std::time::Duration as StdDuration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// HTTP client for the WattAttack indoor-trainer platform.
///
/// The platform is consumed as a black box: login, activity feed, profile
/// read/update and FIT export. Every call carries the configured timeout;
/// failures surface as `AppError::WattAttack` and are caught by the
/// reconciliation loop at per-account granularity.
#[derive(Debug, Clone)]
pub struct WattAttackService {
    client: Client,
    base_url: String,
}

// ============================================================================
// Auth Types
// ============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

// ============================================================================
// Activity Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivitySummary>,
}

/// One entry of the platform's activity feed. `fit_file_id` is absent while
/// the platform is still assembling the export; `athlete_name` is whatever
/// display name was active on the account profile during the ride.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivitySummary {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: String,
    pub distance: Option<f64>,
    #[serde(rename = "elapsedTime")]
    pub elapsed_time: Option<i64>,
    #[serde(rename = "elevationGain")]
    pub elevation_gain: Option<f64>,
    #[serde(rename = "avgPower")]
    pub avg_power: Option<f64>,
    #[serde(rename = "avgCadence")]
    pub avg_cadence: Option<f64>,
    #[serde(rename = "avgHeartRate")]
    pub avg_heart_rate: Option<f64>,
    #[serde(rename = "fitFileId")]
    pub fit_file_id: Option<String>,
    #[serde(rename = "athleteName")]
    pub athlete_name: Option<String>,
}

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub weight: Option<f64>,
    pub ftp: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ftp: Option<i64>,
}

impl WattAttackService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.wattattack.timeout_seconds))
            .build()
            .map_err(AppError::Request)?;

        Ok(Self {
            client,
            base_url: config.wattattack.base_url.clone(),
        })
    }

    /// Log into one platform account. A failure here aborts processing for
    /// that account only.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<String> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::WattAttack(format!(
                "Login failed for {}: HTTP {}",
                email,
                response.status()
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| AppError::WattAttack(format!("Malformed login response: {}", e)))?;

        Ok(body.token)
    }

    /// Fetch the account's activity feed, newest first.
    pub async fn fetch_activities(&self, token: &str) -> AppResult<Vec<ActivitySummary>> {
        let response = self
            .client
            .get(format!("{}/activities", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::WattAttack(format!(
                "Activity feed fetch failed: HTTP {}",
                response.status()
            )));
        }

        let body: ActivitiesResponse = response
            .json()
            .await
            .map_err(|e| AppError::WattAttack(format!("Malformed activity feed: {}", e)))?;

        Ok(body.activities)
    }

    pub async fn get_profile(&self, token: &str) -> AppResult<Profile> {
        let response = self
            .client
            .get(format!("{}/profile", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::WattAttack(format!(
                "Profile fetch failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::WattAttack(format!("Malformed profile response: {}", e)))
    }

    /// Update profile fields on the account (used by the auto-assignment
    /// loop to pre-configure the scheduled rider).
    pub async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> AppResult<()> {
        let response = self
            .client
            .patch(format!("{}/profile", self.base_url))
            .bearer_auth(token)
            .json(update)
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::WattAttack(format!(
                "Profile update failed: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Download a FIT export by file id.
    pub async fn download_fit(&self, token: &str, fit_file_id: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get(format!("{}/fit/{}", self.base_url, fit_file_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(AppError::Request)?;

        if !response.status().is_success() {
            return Err(AppError::WattAttack(format!(
                "FIT download failed for {}: HTTP {}",
                fit_file_id,
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(AppError::Request)?;
        Ok(bytes.to_vec())
    }
}
