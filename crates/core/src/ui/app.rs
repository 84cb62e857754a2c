//! Main application driving the session state machine.
//!
//! `StylistApp` owns the [`Session`], the camera feed for the live preview,
//! and the channel that background analysis work reports back on. All
//! session mutation happens here, on the UI thread, one event at a time.

use super::{camera_view, report, selection};
use crate::camera::{CameraEvent, CameraFeed};
use crate::config::Config;
use crate::gemini::StyleClient;
use crate::image_processing;
use crate::session::{self, AnalysisRequest, AppState, PipelineEvent, Session};
use eframe::egui;
use image::RgbImage;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;

pub struct StylistApp {
    config: Config,
    session: Session,
    camera_index: u32,

    // Camera state; the feed worker owns the device handle
    camera_feed: Option<CameraFeed>,
    camera_error: Option<String>,
    latest_frame: Option<RgbImage>,
    preview_texture: Option<egui::TextureHandle>,

    // Pipeline events from the analysis worker
    rx: Receiver<PipelineEvent>,
    tx: Sender<PipelineEvent>,

    // Report textures, built once when a result lands
    captured_texture: Option<egui::TextureHandle>,
    item_textures: Vec<Option<egui::TextureHandle>>,
}

impl StylistApp {
    pub fn new(config: Config) -> Self {
        Self::with_camera(config, 0)
    }

    pub fn with_camera(config: Config, camera_index: u32) -> Self {
        let (tx, rx) = channel();
        Self {
            config,
            session: Session::new(),
            camera_index,
            camera_feed: None,
            camera_error: None,
            latest_frame: None,
            preview_texture: None,
            rx,
            tx,
            captured_texture: None,
            item_textures: Vec::new(),
        }
    }

    /// Opens the camera for the capture view. Any previous feed is stopped
    /// first so a remount never leaks a hardware handle.
    fn mount_camera(&mut self) {
        self.unmount_camera();
        self.camera_error = None;
        self.latest_frame = None;
        self.preview_texture = None;
        self.camera_feed = Some(CameraFeed::start(self.camera_index));
    }

    fn unmount_camera(&mut self) {
        if let Some(mut feed) = self.camera_feed.take() {
            feed.stop();
        }
    }

    fn drain_camera_events(&mut self, ctx: &egui::Context) {
        let Some(feed) = &self.camera_feed else {
            return;
        };

        // Keep only the newest frame; one texture upload per repaint.
        let mut newest = None;
        while let Some(event) = feed.try_event() {
            match event {
                CameraEvent::Frame(frame) => newest = Some(frame),
                CameraEvent::Error(message) => self.camera_error = Some(message),
            }
        }

        if let Some(frame) = newest {
            let color = image_processing::frame_to_color_image(&frame);
            match &mut self.preview_texture {
                Some(texture) => texture.set(color, egui::TextureOptions::LINEAR),
                None => {
                    self.preview_texture =
                        Some(ctx.load_texture("camera-preview", color, egui::TextureOptions::LINEAR))
                }
            }
            self.latest_frame = Some(frame);
        }
    }

    fn drain_pipeline_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.rx.try_recv() {
            self.session.apply_event(event);
            if self.session.state() == AppState::ShowingResult && self.captured_texture.is_none() {
                self.build_report_textures(ctx);
            }
            ctx.request_repaint();
        }
    }

    fn build_report_textures(&mut self, ctx: &egui::Context) {
        self.captured_texture = self
            .session
            .captured_image()
            .and_then(|jpeg| image_processing::jpeg_to_color_image(jpeg).ok())
            .map(|color| ctx.load_texture("captured-look", color, egui::TextureOptions::LINEAR));

        self.item_textures = self
            .session
            .item_images()
            .iter()
            .enumerate()
            .map(|(index, jpeg)| {
                image_processing::jpeg_to_color_image(jpeg)
                    .ok()
                    .map(|color| {
                        ctx.load_texture(
                            format!("item-{}", index),
                            color,
                            egui::TextureOptions::LINEAR,
                        )
                    })
            })
            .collect();
    }

    /// Encodes the newest preview frame as the session still and hands the
    /// analysis request to a background worker.
    fn capture_still(&mut self) {
        let Some(frame) = &self.latest_frame else {
            return;
        };

        match image_processing::encode_still(frame) {
            Ok(jpeg) => {
                let request = self.session.submit_capture(jpeg);
                // Leaving CameraActive either way (Analyzing or the
                // defensive Error path); release the device.
                self.unmount_camera();
                if let Some(request) = request {
                    self.submit_analysis(request);
                }
            }
            Err(e) => self.camera_error = Some(e.to_string()),
        }
    }

    /// Runs the two-phase pipeline on a background thread with its own
    /// current-thread runtime, reporting back over the event channel.
    fn submit_analysis(&mut self, request: AnalysisRequest) {
        let tx = self.tx.clone();
        let config = self.config.clone();

        thread::spawn(move || {
            let generation = request.generation;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();

            let rt = match runtime {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(PipelineEvent::Failed {
                        generation,
                        message: format!("Failed to start async runtime: {}", e),
                    });
                    return;
                }
            };

            rt.block_on(async {
                let client = match StyleClient::new(&config) {
                    Ok(client) => client,
                    Err(e) => {
                        let _ = tx.send(PipelineEvent::Failed {
                            generation,
                            message: e.to_string(),
                        });
                        return;
                    }
                };

                let progress_tx = tx.clone();
                let outcome = session::run_analysis_pipeline(&client, &request, |item_count| {
                    let _ = progress_tx.send(PipelineEvent::AnalysisReady {
                        generation,
                        item_count,
                    });
                })
                .await;

                match outcome {
                    Ok((analysis, images)) => {
                        let _ = tx.send(PipelineEvent::Completed {
                            generation,
                            analysis,
                            images,
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(PipelineEvent::Failed {
                            generation,
                            message: e.to_string(),
                        });
                    }
                }
            });
        });
    }

    fn reset_all(&mut self) {
        self.unmount_camera();
        self.session.reset();
        self.camera_error = None;
        self.latest_frame = None;
        self.preview_texture = None;
        self.captured_texture = None;
        self.item_textures.clear();
    }

    fn show_analyzing(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.35);
            ui.spinner();
            ui.add_space(12.0);
            ui.label(egui::RichText::new(self.session.loading_message()).size(18.0));
        });
    }

    fn show_error(&mut self, ui: &mut egui::Ui) {
        let mut reset = false;
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.3);
            ui.heading(
                egui::RichText::new("Oops! An Error Occurred.").color(egui::Color32::LIGHT_RED),
            );
            ui.add_space(8.0);
            if let Some(message) = self.session.error() {
                ui.label(message);
            }
            ui.add_space(16.0);
            if ui.button("Try Again").clicked() {
                reset = true;
            }
        });
        if reset {
            self.reset_all();
        }
    }
}

impl eframe::App for StylistApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_pipeline_events(ctx);
        if self.session.state() == AppState::CameraActive {
            self.drain_camera_events(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| match self.session.state() {
            AppState::Idle => {
                if selection::show(ui, &mut self.session) && self.session.activate_camera() {
                    self.mount_camera();
                }
            }
            AppState::CameraActive => {
                let view = camera_view::CameraView {
                    error: self.camera_error.as_deref(),
                    preview: self.preview_texture.as_ref(),
                    ready: self.latest_frame.is_some(),
                };
                if camera_view::show(ui, &view) {
                    self.capture_still();
                }
            }
            AppState::Analyzing => self.show_analyzing(ui),
            AppState::ShowingResult => {
                let selection = self.session.selection();
                let mut reset = false;
                if let (Some(analysis), Some(gender), Some(occasion)) =
                    (self.session.analysis(), selection.gender, selection.occasion)
                {
                    let view = report::ReportView {
                        gender,
                        occasion,
                        analysis,
                        captured: self.captured_texture.as_ref(),
                        item_textures: &self.item_textures,
                    };
                    reset = report::show(ui, &view);
                }
                if reset {
                    self.reset_all();
                }
            }
            AppState::Error => self.show_error(ui),
        });

        // Live preview and spinner need repaints without input events.
        match self.session.state() {
            AppState::CameraActive => ctx.request_repaint_after(Duration::from_millis(33)),
            AppState::Analyzing => ctx.request_repaint_after(Duration::from_millis(100)),
            _ => {}
        }
    }
}
