//! egui views for the stylist application.
//!
//! The UI is split into focused submodules:
//! - [`app`]: the main [`StylistApp`] driving the session state machine
//! - [`selection`]: the idle screen (gender/occasion choice)
//! - [`camera_view`]: live preview and capture affordance
//! - [`report`]: the two-pane style report
//!
//! # Usage
//!
//! ```ignore
//! use stylist_core::ui;
//! use stylist_core::Config;
//!
//! let config = Config::load()?;
//! ui::run_app(config)?;
//! ```

mod app;
mod camera_view;
mod report;
mod selection;

pub use app::StylistApp;

use crate::config::Config;
use crate::error::{AppError, Result};
use eframe::egui;

/// Launches the interactive stylist window and blocks until it closes.
pub fn run_app(config: Config) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 820.0])
            .with_min_inner_size([900.0, 640.0])
            .with_title("AI Fashion Stylist"),
        ..Default::default()
    };

    eframe::run_native(
        "AI Fashion Stylist",
        options,
        Box::new(move |_cc| Ok(Box::new(StylistApp::new(config)) as Box<dyn eframe::App>)),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))
}
