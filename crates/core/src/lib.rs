//! AI Fashion Stylist Core Library
//!
//! This library provides the core functionality for the AI fashion stylist,
//! including webcam capture, Gemini-backed style analysis, product-image
//! generation, and the session state machine driving the UI.
//!
//! # Overview
//!
//! The stylist captures a photo from the user's webcam, asks Gemini for a
//! clothing-style analysis with 3-5 complementary item recommendations,
//! generates one studio product photo per item, and presents a two-pane
//! style report with marketplace search links. The library handles:
//!
//! - **Webcam Capture**: stream lifecycle and still frames via [`camera`]
//! - **Image Processing**: JPEG encoding and texture conversion via
//!   [`image_processing`]
//! - **AI Integration**: analysis and image generation via [`gemini`]
//! - **Session Flow**: the five-state machine and call orchestration via
//!   [`session`]
//! - **User Interface**: the egui application via [`ui`]
//!
//! # Quick Start
//!
//! The simplest way to use the library is through the [`Stylist`] facade:
//!
//! ```ignore
//! use stylist_core::Stylist;
//!
//! // Initialize with environment configuration
//! let app = Stylist::new()?;
//!
//! // List available cameras
//! for camera in app.list_cameras()? {
//!     println!("{}", camera);
//! }
//!
//! // Launch the interactive window
//! app.run_interactive()?;
//! ```

pub mod camera;
pub mod config;
pub mod error;
pub mod gemini;
pub mod image_processing;
pub mod session;
pub mod ui;

// Re-export primary types for convenience
pub use camera::CameraCapturer;
pub use config::Config;
pub use error::{AppError, Result};
pub use gemini::{AnalysisResult, Gender, Occasion, RecommendedItem, StyleClient};
pub use session::{AppState, Session};

/// Main entry point for the stylist application.
///
/// This struct provides a facade over the various subsystems, handling
/// initialization and orchestration. It's the recommended way to use the
/// library for most use cases.
pub struct Stylist {
    config: Config,
}

impl Stylist {
    /// Creates a new stylist with environment-based configuration
    /// (including `.env` files).
    ///
    /// # Errors
    ///
    /// Returns an error if the `GEMINI_API_KEY` credential is missing.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
        })
    }

    /// Creates an instance with custom configuration, e.g. for overriding
    /// the model names.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Lists available cameras with their indices.
    pub fn list_cameras(&self) -> Result<Vec<String>> {
        CameraCapturer::list_cameras()
    }

    /// Launches the interactive window and blocks until it closes.
    pub fn run_interactive(&self) -> Result<()> {
        ui::run_app(self.config.clone())
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
/// This loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}
