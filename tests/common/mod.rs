#![allow(dead_code)]

use std::{
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use woolify_booth::{
    audio::{AudioClip, AudioSession, AudioSink},
    generation::{
        ContentPart, ContentRequest, ContentResponse, GenerationApi, PollPolicy, RemoteClient,
        VideoJob, VideoJobRequest,
    },
    render::CaptionFonts,
    AppError, AppResult, Orchestrator,
};

pub const VIDEO_URI: &str = "https://videos.example/clip.mp4";
pub const API_KEY: &str = "test-key";
pub const PRINT_DELAY: Duration = Duration::from_secs(3);

/// Small solid PNG standing in for both uploads and restyled photos.
pub fn png(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[derive(Debug, Clone)]
pub enum RestyleScript {
    Image(Vec<u8>),
    TextOnly,
    Fail(&'static str),
}

#[derive(Debug, Clone)]
pub enum VideoScript {
    DoneAfter(u32),
    StartFails(&'static str),
    DoneWithoutUri,
}

/// Scripted stand-in for the remote generation service.
pub struct FakeApi {
    pub restyle: Mutex<RestyleScript>,
    pub restyle_delay: Mutex<Duration>,
    pub video: Mutex<VideoScript>,
    pub content_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            restyle: Mutex::new(RestyleScript::Image(png([180, 40, 90]))),
            restyle_delay: Mutex::new(Duration::ZERO),
            video: Mutex::new(VideoScript::DoneAfter(2)),
            content_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeApi {
    pub fn set_restyle(&self, script: RestyleScript) {
        *self.restyle.lock().unwrap() = script;
    }

    pub fn set_restyle_delay(&self, delay: Duration) {
        *self.restyle_delay.lock().unwrap() = delay;
    }

    pub fn set_video(&self, script: VideoScript) {
        *self.video.lock().unwrap() = script;
    }

    pub fn remote_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
            + self.start_calls.load(Ordering::SeqCst)
            + self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationApi for FakeApi {
    async fn generate_content(&self, _request: ContentRequest) -> AppResult<ContentResponse> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.restyle_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let script = self.restyle.lock().unwrap().clone();
        match script {
            RestyleScript::Image(bytes) => {
                use base64::Engine as _;
                Ok(ContentResponse {
                    parts: vec![
                        ContentPart::Text("Here you go".into()),
                        ContentPart::InlineImage {
                            mime_type: "image/png".into(),
                            data: base64::engine::general_purpose::STANDARD.encode(bytes),
                        },
                    ],
                })
            }
            RestyleScript::TextOnly => Ok(ContentResponse {
                parts: vec![ContentPart::Text("I can't do that".into())],
            }),
            RestyleScript::Fail(message) => Err(AppError::msg(message)),
        }
    }

    async fn start_video_job(&self, _request: VideoJobRequest) -> AppResult<VideoJob> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let VideoScript::StartFails(message) = *self.video.lock().unwrap() {
            return Err(AppError::msg(message));
        }
        Ok(VideoJob {
            name: "operations/fake".into(),
            ..VideoJob::default()
        })
    }

    async fn poll_video_job(&self, job: &VideoJob) -> AppResult<VideoJob> {
        let polls = self.poll_calls.fetch_add(1, Ordering::SeqCst) as u32 + 1;
        let script = self.video.lock().unwrap().clone();
        let mut next = job.clone();
        match script {
            VideoScript::DoneAfter(target) if polls >= target => {
                next.done = true;
                next.video_uris = vec![VIDEO_URI.into()];
            }
            VideoScript::DoneWithoutUri => next.done = true,
            _ => {}
        }
        Ok(next)
    }

    fn api_key(&self) -> AppResult<String> {
        Ok(API_KEY.into())
    }
}

/// Counts the clips the booth would have played.
#[derive(Default)]
pub struct CountingSink {
    pub clips: AtomicUsize,
}

impl AudioSink for CountingSink {
    fn play(&self, _clip: AudioClip) {
        self.clips.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Booth {
    pub api: Arc<FakeApi>,
    pub sink: Arc<CountingSink>,
    pub audio: Arc<AudioSession>,
    pub orchestrator: Orchestrator,
}

impl Booth {
    pub fn clips_played(&self) -> usize {
        self.sink.clips.load(Ordering::SeqCst)
    }
}

pub fn booth() -> Booth {
    booth_with(PollPolicy::default(), PRINT_DELAY)
}

/// Booth with short timers for tests on the real clock.
pub fn fast_booth() -> Booth {
    booth_with(
        PollPolicy {
            interval: Duration::from_millis(1),
            max_polls: 10,
        },
        Duration::from_millis(10),
    )
}

fn booth_with(poll: PollPolicy, print_delay: Duration) -> Booth {
    let api = Arc::new(FakeApi::default());
    let sink = Arc::new(CountingSink::default());
    let audio = Arc::new(AudioSession::with_seed(sink.clone(), 11));
    let client = RemoteClient::new(api.clone()).with_poll_policy(poll);
    let orchestrator = Orchestrator::new(client, audio.clone(), print_delay);

    Booth {
        api,
        sink,
        audio,
        orchestrator,
    }
}

/// DejaVu Sans Mono, so caption rendering does not depend on the host's fonts.
pub fn bundled_fonts() -> CaptionFonts {
    CaptionFonts::from_font_data([include_bytes!("../fixtures/DejaVuSansMono.ttf").to_vec()])
}
