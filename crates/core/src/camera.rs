//! Webcam capture functionality.
//!
//! This module wraps `nokhwa` to provide the capture device adapter:
//! acquiring a camera stream, decoding live frames, and releasing the
//! hardware when the capture view is torn down.
//!
//! # Example
//!
//! ```ignore
//! use stylist_core::camera::CameraCapturer;
//!
//! // List available cameras
//! for camera in CameraCapturer::list_cameras()? {
//!     println!("{}", camera);
//! }
//!
//! // Open the default camera and grab one frame
//! let mut capturer = CameraCapturer::open(0)?;
//! let frame = capturer.next_frame()?;
//! ```

use crate::error::{AppError, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Preferred capture resolution; the device may negotiate the closest
/// format it actually supports.
const PREFERRED_WIDTH: u32 = 1280;
const PREFERRED_HEIGHT: u32 = 720;
const PREFERRED_FPS: u32 = 30;

/// Webcam capturer that owns an open camera stream.
///
/// Exactly one stream is held per instance; the stream is released when the
/// instance is dropped (or [`close`](CameraCapturer::close) is called), so a
/// remount must drop the previous capturer before opening a new one.
pub struct CameraCapturer {
    camera: Camera,
}

impl CameraCapturer {
    /// Opens the camera at `index` and starts its stream.
    ///
    /// Requests 1280x720; the device may negotiate a lower resolution.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Camera`] if the device is absent, busy, or access
    /// is denied. There is no automatic retry.
    pub fn open(index: u32) -> Result<Self> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(PREFERRED_WIDTH, PREFERRED_HEIGHT),
                FrameFormat::MJPEG,
                PREFERRED_FPS,
            ),
        ));

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| AppError::camera(format!("Failed to open camera {}: {}", index, e)))?;

        camera
            .open_stream()
            .map_err(|e| AppError::camera(format!("Failed to start camera stream: {}", e)))?;

        let negotiated = camera.resolution();
        info!(
            index,
            width = negotiated.width(),
            height = negotiated.height(),
            "camera stream opened"
        );

        Ok(Self { camera })
    }

    /// Human-readable name of the open device.
    pub fn name(&self) -> String {
        self.camera.info().human_name()
    }

    /// Negotiated stream resolution as (width, height).
    pub fn resolution(&self) -> (u32, u32) {
        let res = self.camera.resolution();
        (res.width(), res.height())
    }

    /// Blocks until the next frame is available and decodes it to RGB at
    /// source resolution.
    pub fn next_frame(&mut self) -> Result<RgbImage> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| AppError::camera(format!("Failed to read frame: {}", e)))?;

        buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| AppError::camera(format!("Failed to decode frame: {}", e)))
    }

    /// Stops the stream and releases the device.
    ///
    /// Dropping the capturer has the same effect; this exists for callers
    /// that want to observe shutdown errors.
    pub fn close(mut self) -> Result<()> {
        self.camera
            .stop_stream()
            .map_err(|e| AppError::camera(format!("Failed to stop camera stream: {}", e)))
    }

    /// Lists available cameras with their backend indices.
    pub fn list_cameras() -> Result<Vec<String>> {
        let cameras = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| AppError::camera(format!("Failed to enumerate cameras: {}", e)))?;

        Ok(cameras
            .iter()
            .map(|info| format!("Camera {}: {}", info.index(), info.human_name()))
            .collect())
    }
}

impl Drop for CameraCapturer {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}

/// Events emitted by the camera worker thread.
pub enum CameraEvent {
    /// A decoded live frame. Arrival of the first frame marks the stream as
    /// ready for capture.
    Frame(RgbImage),
    /// The camera could not be opened or the stream died. Surfaced inline on
    /// the capture view; the worker exits afterwards.
    Error(String),
}

/// Background camera feed for the live preview.
///
/// The worker thread exclusively owns the [`CameraCapturer`] and pushes
/// decoded frames over a channel; the UI thread never touches the device
/// handle directly. Stopping the feed (or dropping it) joins the worker,
/// which releases the stream on exit.
pub struct CameraFeed {
    rx: Receiver<CameraEvent>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CameraFeed {
    /// Spawns the worker and starts streaming from the camera at `index`.
    ///
    /// Open errors are not returned here; they arrive as a
    /// [`CameraEvent::Error`] so the capture view can show them inline.
    pub fn start(index: u32) -> Self {
        let (tx, rx) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();

        let worker = thread::spawn(move || run_feed(index, tx, worker_stop));

        Self {
            rx,
            stop,
            worker: Some(worker),
        }
    }

    /// Drains the next pending event, if any. Non-blocking; the UI calls
    /// this once per repaint and keeps only the newest frame.
    pub fn try_event(&self) -> Option<CameraEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Signals the worker to stop and waits for it to release the camera.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            debug!("camera feed stopped");
        }
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_feed(index: u32, tx: Sender<CameraEvent>, stop: Arc<AtomicBool>) {
    let mut capturer = match CameraCapturer::open(index) {
        Ok(capturer) => capturer,
        Err(e) => {
            let _ = tx.send(CameraEvent::Error(format!(
                "Could not access the camera. Please check permissions and that no other \
                 application is using it. ({})",
                e
            )));
            return;
        }
    };

    while !stop.load(Ordering::Relaxed) {
        match capturer.next_frame() {
            Ok(frame) => {
                // Receiver gone means the view was torn down; just exit.
                if tx.send(CameraEvent::Frame(frame)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(CameraEvent::Error(e.to_string()));
                break;
            }
        }
    }
    // CameraCapturer::drop releases the stream.
}
