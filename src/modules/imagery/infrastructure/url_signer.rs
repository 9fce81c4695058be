//! Signed URLs for the imagery metadata endpoint: HMAC-SHA1 of the path and
//! query under the URL-safe base64 decoded secret.

use crate::shared::errors::{AppError, AppResult};
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub fn sign_path(path_and_query: &str, secret: &str) -> AppResult<String> {
    let key = URL_SAFE
        .decode(secret.trim())
        .or_else(|_| URL_SAFE_NO_PAD.decode(secret.trim().trim_end_matches('=')))
        .map_err(|e| AppError::ValidationError(format!("Invalid signing secret: {}", e)))?;

    let mut mac = HmacSha1::new_from_slice(&key)
        .map_err(|e| AppError::InternalError(format!("HMAC key rejected: {}", e)))?;
    mac.update(path_and_query.as_bytes());

    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

/// Append `&signature=` to `url`.
pub fn sign_url(url: &str, secret: &str) -> AppResult<String> {
    let parsed = Url::parse(url).map_err(|e| AppError::InvalidInput(format!("{}: {}", url, e)))?;
    let query = parsed
        .query()
        .ok_or_else(|| AppError::InvalidInput(format!("{} has no query to sign", url)))?;
    let signature = sign_path(&format!("{}?{}", parsed.path(), query), secret)?;
    Ok(format!("{}&signature={}", url, signature))
}
