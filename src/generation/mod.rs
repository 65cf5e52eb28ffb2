//! Restyle and animate requests against a generative backend.
//!
//! [`RemoteClient`] owns the request shaping (style prompts, fixed video
//! parameters, bounded polling) and talks to the wire through the
//! [`GenerationApi`] trait so the HTTP backend can be swapped out.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    error::{AppError, AppResult},
    models::{AnimationStyle, GenerationStyle, StylizedImage, VideoRef},
    prompt, storage,
};

pub const VIDEO_RESOLUTION: &str = "720p";
pub const VIDEO_ASPECT_RATIO: &str = "1:1";
pub const VIDEO_COUNT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub image_base64: String,
    pub mime_type: String,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineImage { mime_type: String, data: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentResponse {
    pub parts: Vec<ContentPart>,
}

impl ContentResponse {
    /// First inline image in response order.
    pub fn first_inline_image(&self) -> Option<(&str, &str)> {
        self.parts.iter().find_map(|part| match part {
            ContentPart::InlineImage { mime_type, data } if !data.is_empty() => {
                Some((mime_type.as_str(), data.as_str()))
            }
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJobRequest {
    pub prompt: String,
    pub image_base64: String,
    pub mime_type: String,
    pub number_of_videos: u32,
    pub resolution: &'static str,
    pub aspect_ratio: &'static str,
}

/// Handle and status of a long-running video job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoJob {
    pub name: String,
    pub done: bool,
    pub video_uris: Vec<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn generate_content(&self, request: ContentRequest) -> AppResult<ContentResponse>;

    async fn start_video_job(&self, request: VideoJobRequest) -> AppResult<VideoJob>;

    async fn poll_video_job(&self, job: &VideoJob) -> AppResult<VideoJob>;

    /// Credential appended to video locators. Missing keys are `AppError::Credential`.
    fn api_key(&self) -> AppResult<String>;
}

/// Host facility that lets the user pick an API key interactively.
#[async_trait]
pub trait CredentialSelector: Send + Sync {
    async fn has_selected_key(&self) -> AppResult<bool>;

    fn can_prompt(&self) -> bool;

    async fn open_selector(&self) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: 120,
        }
    }
}

#[derive(Clone)]
pub struct RemoteClient {
    api: Arc<dyn GenerationApi>,
    credentials: Option<Arc<dyn CredentialSelector>>,
    poll: PollPolicy,
}

impl RemoteClient {
    pub fn new(api: Arc<dyn GenerationApi>) -> Self {
        Self {
            api,
            credentials: None,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_credential_selector(mut self, selector: Arc<dyn CredentialSelector>) -> Self {
        self.credentials = Some(selector);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub async fn restyle_image(
        &self,
        bytes: &[u8],
        style: GenerationStyle,
    ) -> AppResult<StylizedImage> {
        let mime = storage::sniff_image_mime(bytes)?;

        let Some(instruction) = prompt::build_restyle_prompt(style) else {
            tracing::debug!(style = style.as_str(), "passthrough style, skipping remote call");
            return Ok(StylizedImage::new(bytes.to_vec(), mime));
        };

        tracing::info!(style = style.as_str(), bytes = bytes.len(), "requesting restyle");
        let response = self
            .api
            .generate_content(ContentRequest {
                image_base64: STANDARD.encode(bytes),
                mime_type: mime.to_string(),
                instruction,
            })
            .await?;

        let (_, data) = response
            .first_inline_image()
            .ok_or_else(|| AppError::generation("No image data found in response"))?;
        let image_bytes = STANDARD.decode(data.trim())?;
        let image_mime = storage::sniff_image_mime(&image_bytes).unwrap_or("image/png");

        Ok(StylizedImage::new(image_bytes, image_mime))
    }

    pub async fn animate_image(
        &self,
        image: &StylizedImage,
        motion_prompt: &str,
        style: AnimationStyle,
        cancel: &CancellationToken,
    ) -> AppResult<VideoRef> {
        self.ensure_credential().await?;
        let api_key = self.api.api_key()?;

        let request = VideoJobRequest {
            prompt: prompt::build_animation_prompt(motion_prompt, style)?,
            image_base64: STANDARD.encode(&image.bytes),
            mime_type: image.mime.to_string(),
            number_of_videos: VIDEO_COUNT,
            resolution: VIDEO_RESOLUTION,
            aspect_ratio: VIDEO_ASPECT_RATIO,
        };

        tracing::info!(style = style.as_str(), "submitting video job");
        let mut job = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            job = self.api.start_video_job(request) => job?,
        };

        let mut polls = 0u32;
        while !job.done {
            if polls >= self.poll.max_polls {
                tracing::warn!(job = %job.name, polls, "video job still running, giving up");
                return Err(AppError::generation(format!(
                    "Video generation did not finish after {polls} status checks"
                )));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                _ = tokio::time::sleep(self.poll.interval) => {}
            }

            polls += 1;
            tracing::debug!(job = %job.name, attempt = polls, "checking video job");
            job = tokio::select! {
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                next = self.api.poll_video_job(&job) => next?,
            };
        }

        if let Some(error) = job.error.as_deref() {
            return Err(AppError::generation(format!("Video generation failed: {error}")));
        }

        let uri = job
            .video_uris
            .first()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| AppError::generation("Failed to generate video URI"))?;

        tracing::info!(job = %job.name, polls, "video job finished");
        Ok(VideoRef {
            url: append_key(uri, &api_key)?,
        })
    }

    async fn ensure_credential(&self) -> AppResult<()> {
        let Some(selector) = &self.credentials else {
            return Ok(());
        };

        if selector.has_selected_key().await? {
            return Ok(());
        }

        if !selector.can_prompt() {
            return Err(AppError::credential(
                "No API key selected and no way to select one",
            ));
        }

        tracing::info!("no API key selected, opening key selector");
        selector.open_selector().await
    }
}

fn append_key(uri: &str, api_key: &str) -> AppResult<String> {
    let mut url = Url::parse(uri)?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url.into())
}
