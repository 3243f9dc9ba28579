//! Mastodon platform implementation
//!
//! Uses the megalodon library, so any Fediverse server that speaks the
//! Mastodon API works. Status ids on these servers are numeric strings and
//! are parsed into [`PostId`].

use async_trait::async_trait;
use megalodon::{Megalodon, SNS};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::MastodonConfig;
use crate::credentials::Credentials;
use crate::error::{PlatformError, Result};
use crate::platforms::PlatformClient;
use crate::types::{EngagementCounters, MediaFile, MediaId, PostId, PublishRequest, PublishedPost};

pub struct MastodonClient {
    client: Box<dyn Megalodon + Send + Sync>,
    instance_url: String,
}

impl MastodonClient {
    /// Create a client for `instance_url` authenticated with `access_token`
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if megalodon rejects the instance URL.
    pub fn new(instance_url: String, access_token: String) -> Result<Self> {
        let instance_url = normalize_instance_url(&instance_url);
        let client = megalodon::generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token),
            None,
        )
        .map_err(|e| {
            PlatformError::Authentication(format!("Failed to create Mastodon client: {:?}", e))
        })?;

        Ok(Self {
            client,
            instance_url,
        })
    }

    /// Create a client from configuration and the run's credentials.
    ///
    /// Only the access token is sent to the server.
    pub fn from_config(config: &MastodonConfig, credentials: &Credentials) -> Result<Self> {
        let token = credentials.access_token.expose_secret().trim().to_string();
        if token.is_empty() {
            return Err(PlatformError::Authentication("Access token is empty".to_string()).into());
        }

        Self::new(config.instance.clone(), token)
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }
}

#[async_trait]
impl PlatformClient for MastodonClient {
    fn name(&self) -> &str {
        "mastodon"
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "authenticate"))?;

        Ok(())
    }

    async fn upload_media(&self, media: &MediaFile) -> Result<MediaId> {
        // The server derives the media category from the file type
        debug!(file = %media.file_name(), kind = %media.kind, "uploading media");

        let response = self
            .client
            .upload_media(media.path.to_string_lossy().into_owned(), None)
            .await
            .map_err(|e| map_megalodon_error(e, "upload media"))?;

        let media_id = match response.json {
            megalodon::entities::UploadMedia::Attachment(attachment) => attachment.id,
            megalodon::entities::UploadMedia::AsyncAttachment(attachment) => attachment.id,
        };

        Ok(media_id)
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost> {
        if request.text.trim().is_empty() {
            return Err(PlatformError::Validation("Content cannot be empty".to_string()).into());
        }

        let options = megalodon::megalodon::PostStatusInputOptions {
            media_ids: (!request.media_ids.is_empty()).then(|| request.media_ids.clone()),
            in_reply_to_id: request.reply_to.map(|id| id.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .post_status(request.text.clone(), Some(&options))
            .await
            .map_err(|e| map_megalodon_error(e, "post status"))?;

        match response.json {
            megalodon::megalodon::PostStatusOutput::Status(status) => {
                let permalink = status.url.clone().unwrap_or_else(|| status.uri.clone());
                Ok(PublishedPost {
                    id: parse_status_id(&status.id)?,
                    permalink,
                })
            }
            megalodon::megalodon::PostStatusOutput::ScheduledStatus(scheduled) => {
                Err(PlatformError::Posting(format!(
                    "Server scheduled status {} instead of publishing it",
                    scheduled.id
                ))
                .into())
            }
        }
    }

    async fn fetch_counters(&self, id: PostId) -> Result<EngagementCounters> {
        let response = self
            .client
            .get_status(id.to_string())
            .await
            .map_err(|e| map_megalodon_error(e, "get status"))?;

        let status = response.json;
        Ok(EngagementCounters {
            favorite: status.favourites_count as u64,
            share: status.reblogs_count as u64,
            reply: status.replies_count as u64,
        })
    }
}

fn normalize_instance_url(instance: &str) -> String {
    let trimmed = instance.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn parse_status_id(id: &str) -> Result<PostId> {
    id.parse::<PostId>().map_err(|_| {
        PlatformError::Posting(format!("Server returned non-numeric status id '{}'", id)).into()
    })
}

/// Map megalodon errors to `PlatformError` by HTTP status, then by message
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    let error_str = error.to_string();
    let error_lower = error_str.to_lowercase();

    match extract_http_status(&error_str) {
        Some(401) | Some(403) => PlatformError::Authentication(format!(
            "Mastodon authentication failed ({}): {}. \
             Suggestion: Verify the access token is valid and has write scope.",
            context, error_str
        )),
        Some(404) => PlatformError::NotFound(format!("Mastodon ({}): {}", context, error_str)),
        Some(422) => PlatformError::Validation(format!(
            "Mastodon validation failed ({}): {}",
            context, error_str
        )),
        Some(429) => PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): {}",
            context, error_str
        )),
        Some(500..=599) => PlatformError::Network(format!(
            "Mastodon server error ({}): {}",
            context, error_str
        )),
        Some(_) => {
            PlatformError::Network(format!("Mastodon HTTP error ({}): {}", context, error_str))
        }
        None => {
            if error_lower.contains("unauthorized") || error_lower.contains("forbidden") {
                PlatformError::Authentication(format!(
                    "Mastodon authentication failed ({}): {}",
                    context, error_str
                ))
            } else if error_lower.contains("not found") || error_lower.contains("record not found")
            {
                PlatformError::NotFound(format!("Mastodon ({}): {}", context, error_str))
            } else if error_lower.contains("too many requests") {
                PlatformError::RateLimit(format!(
                    "Mastodon rate limit exceeded ({}): {}",
                    context, error_str
                ))
            } else if error_lower.contains("parse") || error_lower.contains("json") {
                PlatformError::Posting(format!(
                    "Mastodon response parse error ({}): {}",
                    context, error_str
                ))
            } else {
                PlatformError::Network(format!("Mastodon error ({}): {}", context, error_str))
            }
        }
    }
}

/// Extract an HTTP status code such as "HTTP 404" or "status 429" from an error message
fn extract_http_status(error_str: &str) -> Option<u16> {
    let prefixes = ["HTTP ", "status ", "code: ", "status_code: "];

    for prefix in &prefixes {
        if let Some(pos) = error_str.find(prefix) {
            let after_prefix = &error_str[pos + prefix.len()..];
            if let Some(code) = after_prefix
                .get(0..3)
                .and_then(|code_str| code_str.parse::<u16>().ok())
                .filter(|code| (100..=599).contains(code))
            {
                return Some(code);
            }
        }
    }

    let bytes = error_str.as_bytes();
    for (i, window) in bytes.windows(4).enumerate() {
        let is_code = window[..3].iter().all(u8::is_ascii_digit)
            && (window[3] == b':' || window[3] == b' ')
            && (i == 0 || !bytes[i - 1].is_ascii_digit());
        if !is_code {
            continue;
        }
        if let Some(code) = std::str::from_utf8(&window[..3])
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .filter(|code| (100..=599).contains(code))
        {
            return Some(code);
        }
    }

    None
}
