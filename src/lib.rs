pub mod audio;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod models;
pub mod orchestrator;
pub mod panels;
pub mod prompt;
pub mod render;
pub mod storage;

use std::sync::Arc;

use audio::{AudioSession, AudioSink};
use config::BoothConfig;
use gemini::{GeminiClient, GeminiConfig};
use generation::{GenerationApi, RemoteClient};
use render::CaptionFonts;

pub use error::{AppError, AppResult};
pub use orchestrator::{Orchestrator, Outcome};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub audio: Arc<AudioSession>,
    pub fonts: CaptionFonts,
    pub config: BoothConfig,
}

impl AppState {
    pub fn new(
        api: Arc<dyn GenerationApi>,
        sink: Arc<dyn AudioSink>,
        fonts: CaptionFonts,
        config: BoothConfig,
    ) -> Self {
        let audio = Arc::new(AudioSession::new(sink));
        let orchestrator = Orchestrator::from_config(RemoteClient::new(api), audio.clone(), &config);

        Self {
            orchestrator,
            audio,
            fonts,
            config,
        }
    }

    /// Gemini-backed booth configured from `.env` files and the environment. Sound plays only
    /// with the `sound` feature.
    pub fn from_env() -> AppResult<Self> {
        load_env_files();

        let config = BoothConfig::from_env()?;
        let api = GeminiClient::new(GeminiConfig::from_env());
        let fonts = CaptionFonts::system();
        if fonts.face_count() == 0 {
            tracing::warn!("no system fonts found, exported captions will be blank");
        }

        Ok(Self::new(Arc::new(api), audio::default_sink(), fonts, config))
    }

    pub fn shutdown(&self) {
        self.orchestrator.reset();
        self.audio.dispose();
    }
}

pub fn load_env_files() {
    let _ = dotenvy::from_filename(".env");
    let _ = dotenvy::from_filename("../.env");
    let _ = dotenvy::from_filename("../../.env");
}
