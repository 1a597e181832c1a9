//! OAuth2 refresh-token exchange for the storage backend.

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Offline credentials, stored as a small JSON file next to the tool.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Auth(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Auth(format!("parsing {}: {e}", path.display())))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Trade the refresh token for a short-lived access token.
pub async fn exchange(http: &Client, creds: &Credentials) -> Result<String> {
    let resp = http
        .post(TOKEN_URL)
        .form(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", creds.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(|e| Error::Auth(format!("token endpoint unreachable: {e}")))?;

    if !resp.status().is_success() {
        return Err(Error::Auth(format!(
            "token endpoint refused the refresh token: {}",
            resp.status()
        )));
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| Error::Auth(format!("bad token response: {e}")))?;
    Ok(token.access_token)
}
