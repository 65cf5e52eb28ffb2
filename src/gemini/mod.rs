use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    generation::{
        ContentPart, ContentRequest, ContentResponse, GenerationApi, VideoJob, VideoJobRequest,
    },
};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub image_model: String,
    pub video_model: String,
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let api_key = env_non_empty("GEMINI_API_KEY").or_else(|| env_non_empty("API_KEY"));
        let api_base = env_non_empty("GEMINI_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let image_model =
            env_non_empty("GEMINI_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        let video_model =
            env_non_empty("GEMINI_VIDEO_MODEL").unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string());

        Self {
            api_key,
            api_base,
            image_model,
            video_model,
        }
    }

    fn require_api_key(&self) -> AppResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::credential("API Key not found. Set GEMINI_API_KEY (or API_KEY) in .env")
        })
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }

    async fn post_json(&self, url: &str, payload: &impl Serialize) -> AppResult<Value> {
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", self.config.require_api_key()?)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        read_json_response(response).await
    }

    async fn get_json(&self, url: &str) -> AppResult<Value> {
        let response = self
            .http_client
            .get(url)
            .header("x-goog-api-key", self.config.require_api_key()?)
            .send()
            .await?;

        read_json_response(response).await
    }
}

#[async_trait]
impl GenerationApi for GeminiClient {
    async fn generate_content(&self, request: ContentRequest) -> AppResult<ContentResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.image_model
        );
        let payload = build_content_payload(&request);
        tracing::debug!(model = %self.config.image_model, "POST generateContent");

        let response_json = self.post_json(&url, &payload).await?;
        let parts = extract_content_parts(&response_json)
            .ok_or_else(|| AppError::generation("No content generated"))?;

        Ok(ContentResponse { parts })
    }

    async fn start_video_job(&self, request: VideoJobRequest) -> AppResult<VideoJob> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.config.api_base, self.config.video_model
        );
        let payload = build_video_payload(&request);
        tracing::debug!(model = %self.config.video_model, "POST predictLongRunning");

        let response_json = self.post_json(&url, &payload).await?;
        parse_video_job(&response_json)
    }

    async fn poll_video_job(&self, job: &VideoJob) -> AppResult<VideoJob> {
        let url = format!("{}/{}", self.config.api_base, job.name.trim_start_matches('/'));
        let response_json = self.get_json(&url).await?;
        parse_video_job(&response_json)
    }

    fn api_key(&self) -> AppResult<String> {
        self.config.require_api_key().map(str::to_string)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentPayload {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<PayloadPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PayloadPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct VideoPayload {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
    image: VideoImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    sample_count: u32,
    resolution: String,
    aspect_ratio: String,
}

fn build_content_payload(request: &ContentRequest) -> ContentPayload {
    ContentPayload {
        contents: vec![Content {
            parts: vec![
                PayloadPart::InlineData {
                    inline_data: InlineData {
                        mime_type: request.mime_type.clone(),
                        data: request.image_base64.clone(),
                    },
                },
                PayloadPart::Text {
                    text: request.instruction.clone(),
                },
            ],
        }],
    }
}

fn build_video_payload(request: &VideoJobRequest) -> VideoPayload {
    VideoPayload {
        instances: vec![VideoInstance {
            prompt: request.prompt.clone(),
            image: VideoImage {
                bytes_base64_encoded: request.image_base64.clone(),
                mime_type: request.mime_type.clone(),
            },
        }],
        parameters: VideoParameters {
            sample_count: request.number_of_videos,
            resolution: request.resolution.to_string(),
            aspect_ratio: request.aspect_ratio.to_string(),
        },
    }
}

async fn read_json_response(response: reqwest::Response) -> AppResult<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(parse_gemini_http_error(status, &body));
    }

    Ok(serde_json::from_str(&body)?)
}

fn parse_gemini_http_error(status: StatusCode, body: &str) -> AppError {
    let gemini_error = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .or_else(|| json.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    AppError::msg(format!("Gemini request failed ({status}): {gemini_error}"))
}

fn extract_content_parts(response: &Value) -> Option<Vec<ContentPart>> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)?;

    let parts = parts
        .iter()
        .filter_map(|part| {
            let inline = part.get("inlineData").or_else(|| part.get("inline_data"));
            if let Some(inline) = inline {
                let data = inline.get("data").and_then(Value::as_str)?;
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .unwrap_or("image/png");
                return Some(ContentPart::InlineImage {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                });
            }

            part.get("text")
                .and_then(Value::as_str)
                .map(|text| ContentPart::Text(text.to_string()))
        })
        .collect();

    Some(parts)
}

fn parse_video_job(response: &Value) -> AppResult<VideoJob> {
    let name = response
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::generation("video job response carried no operation name"))?
        .to_string();
    let done = response.get("done").and_then(Value::as_bool).unwrap_or(false);
    let error = response
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string);

    let samples = response
        .pointer("/response/generateVideoResponse/generatedSamples")
        .or_else(|| response.pointer("/response/generatedVideos"))
        .and_then(Value::as_array);
    let video_uris = samples
        .map(|samples| {
            samples
                .iter()
                .filter_map(|sample| sample.pointer("/video/uri").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(VideoJob {
        name,
        done,
        video_uris,
        error,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn content_payload_puts_image_before_instruction() {
        let payload = build_content_payload(&ContentRequest {
            image_base64: "AAAA".into(),
            mime_type: "image/png".into(),
            instruction: "make it wool".into(),
        });

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "contents": [{
                    "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                        { "text": "make it wool" }
                    ]
                }]
            })
        );
    }

    #[test]
    fn video_payload_uses_fixed_parameters() {
        let payload = build_video_payload(&VideoJobRequest {
            prompt: "Animate this character: waving.".into(),
            image_base64: "AAAA".into(),
            mime_type: "image/png".into(),
            number_of_videos: 1,
            resolution: "720p",
            aspect_ratio: "1:1",
        });
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["parameters"]["sampleCount"], 1);
        assert_eq!(value["parameters"]["resolution"], "720p");
        assert_eq!(value["parameters"]["aspectRatio"], "1:1");
        assert_eq!(value["instances"][0]["image"]["bytesBase64Encoded"], "AAAA");
    }

    #[test]
    fn content_parts_keep_response_order() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your felted photo" },
                        { "inlineData": { "mimeType": "image/png", "data": "Zmlyc3Q=" } },
                        { "inline_data": { "mime_type": "image/jpeg", "data": "c2Vjb25k" } }
                    ]
                }
            }]
        });

        let parts = extract_content_parts(&response).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ContentPart::Text("Here is your felted photo".into()));
        let first = ContentResponse { parts }.first_inline_image().map(|(_, d)| d.to_string());
        assert_eq!(first.as_deref(), Some("Zmlyc3Q="));
    }

    #[test]
    fn missing_candidates_yield_no_parts() {
        assert!(extract_content_parts(&json!({ "promptFeedback": {} })).is_none());
    }

    #[test]
    fn video_job_reads_generated_samples() {
        let job = parse_video_job(&json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{ "video": { "uri": "https://files.example/abc?alt=media" } }]
                }
            }
        }))
        .unwrap();

        assert!(job.done);
        assert_eq!(job.video_uris, vec!["https://files.example/abc?alt=media".to_string()]);
    }

    #[test]
    fn pending_video_job_is_not_done() {
        let job = parse_video_job(&json!({ "name": "models/veo/operations/abc" })).unwrap();
        assert!(!job.done);
        assert!(job.video_uris.is_empty());
    }

    #[test]
    fn http_error_prefers_error_message() {
        let error = parse_gemini_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"Image too large"}}"#,
        );
        assert_eq!(
            error.to_string(),
            "Gemini request failed (400 Bad Request): Image too large"
        );
    }
}
