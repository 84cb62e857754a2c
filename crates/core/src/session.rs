//! Application state machine and remote-call orchestration.
//!
//! A [`Session`] owns all per-session data (selection, captured still,
//! analysis, generated images) and drives the five-state flow:
//!
//! `Idle -> CameraActive -> Analyzing -> ShowingResult`, with `Error`
//! reachable from capture validation and from the analysis pipeline.
//! "Try again" from any terminal screen performs a full reset back to `Idle`.
//!
//! All mutation happens on the UI thread in response to discrete events;
//! background work reports back through [`PipelineEvent`]s tagged with the
//! session generation, so completions that arrive after a reset are detected
//! and dropped instead of being applied to the fresh session.

use crate::error::{AppError, Result};
use crate::gemini::{AnalysisResult, Gender, Occasion, RecommendedItem, StyleClient};
use futures::future;
use std::future::Future;
use tracing::{debug, warn};

/// Fixed user-facing prefix for analysis pipeline failures.
const FAILURE_PREFIX: &str = "Failed to get recommendation. Please try again. Details: ";

/// Which view the application is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    CameraActive,
    Analyzing,
    ShowingResult,
    Error,
}

/// The user's gender/occasion choice. Both fields must be set before the
/// camera can be activated; immutable once a capture has been submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub gender: Option<Gender>,
    pub occasion: Option<Occasion>,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.gender.is_some() && self.occasion.is_some()
    }
}

/// Everything a background analysis run needs, snapshotted at capture time.
///
/// Carries the generation it was issued under so its results can be matched
/// against the session later.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub gender: Gender,
    pub occasion: Occasion,
    pub generation: u64,
}

/// Events sent from the analysis worker back to the UI thread.
pub enum PipelineEvent {
    /// The analysis call finished; image generation for `item_count` items
    /// is starting.
    AnalysisReady { generation: u64, item_count: usize },
    /// The full pipeline finished; `images` is index-aligned with
    /// `analysis.recommendations`.
    Completed {
        generation: u64,
        analysis: AnalysisResult,
        images: Vec<Vec<u8>>,
    },
    /// Any stage failed. No partial results are carried.
    Failed { generation: u64, message: String },
}

/// The single live session: current state plus all data owned by it.
pub struct Session {
    state: AppState,
    selection: Selection,
    captured_image: Option<Vec<u8>>,
    analysis: Option<AnalysisResult>,
    item_images: Vec<Vec<u8>>,
    error: Option<String>,
    loading_message: String,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: AppState::Idle,
            selection: Selection::default(),
            captured_image: None,
            analysis: None,
            item_images: Vec::new(),
            error: None,
            loading_message: String::new(),
            generation: 0,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn captured_image(&self) -> Option<&[u8]> {
        self.captured_image.as_deref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn item_images(&self) -> &[Vec<u8>] {
        &self.item_images
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn loading_message(&self) -> &str {
        &self.loading_message
    }

    /// Current generation; bumped on every reset so stale async completions
    /// can be told apart from live ones.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Selection can only change on the Idle screen.
    pub fn set_gender(&mut self, gender: Gender) {
        if self.state == AppState::Idle {
            self.selection.gender = Some(gender);
        }
    }

    pub fn set_occasion(&mut self, occasion: Occasion) {
        if self.state == AppState::Idle {
            self.selection.occasion = Some(occasion);
        }
    }

    /// Whether the "start your style analysis" affordance is enabled.
    pub fn can_start(&self) -> bool {
        self.state == AppState::Idle && self.selection.is_complete()
    }

    /// `Idle -> CameraActive`. Guarded by a complete selection; the UI keeps
    /// the affordance disabled otherwise, so a `false` return means the
    /// caller raced the guard and nothing happened.
    pub fn activate_camera(&mut self) -> bool {
        if !self.can_start() {
            return false;
        }
        self.state = AppState::CameraActive;
        true
    }

    /// `CameraActive -> Analyzing`, triggered by a capture event carrying the
    /// JPEG still. Returns the request the caller hands to the background
    /// worker.
    ///
    /// Defensive double-check: the UI cannot normally reach CameraActive with
    /// an incomplete selection, but if it happens the session moves to
    /// `Error` instead and no request is issued.
    pub fn submit_capture(&mut self, jpeg: Vec<u8>) -> Option<AnalysisRequest> {
        if self.state != AppState::CameraActive {
            return None;
        }

        let (Some(gender), Some(occasion)) = (self.selection.gender, self.selection.occasion)
        else {
            self.error = Some("Please select a gender and occasion before capturing.".to_string());
            self.state = AppState::Error;
            return None;
        };

        self.captured_image = Some(jpeg.clone());
        self.loading_message = "Analyzing your style...".to_string();
        self.state = AppState::Analyzing;

        Some(AnalysisRequest {
            image: jpeg,
            gender,
            occasion,
            generation: self.generation,
        })
    }

    /// Applies a pipeline event, dropping it if it belongs to an abandoned
    /// generation.
    pub fn apply_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::AnalysisReady {
                generation,
                item_count,
            } => {
                if !self.is_live(generation) {
                    return;
                }
                if self.state == AppState::Analyzing {
                    self.loading_message = format!("Creating {} recommendations...", item_count);
                }
            }
            PipelineEvent::Completed {
                generation,
                analysis,
                images,
            } => {
                if !self.is_live(generation) {
                    return;
                }
                self.complete(analysis, images);
            }
            PipelineEvent::Failed {
                generation,
                message,
            } => {
                if !self.is_live(generation) {
                    return;
                }
                self.fail(message);
            }
        }
    }

    /// `Analyzing -> ShowingResult`, or `-> Error` when the image set does
    /// not line up with the recommendations. A mismatch here is a real
    /// invariant violation and is surfaced explicitly rather than silently
    /// discarded.
    fn complete(&mut self, analysis: AnalysisResult, images: Vec<Vec<u8>>) {
        if self.state != AppState::Analyzing {
            return;
        }

        let violation = if images.len() != analysis.recommendations.len() {
            Some(format!(
                "{} recommendations but {} generated images",
                analysis.recommendations.len(),
                images.len()
            ))
        } else if self.captured_image.is_none() {
            Some("result arrived without a captured image".to_string())
        } else {
            None
        };

        if let Some(violation) = violation {
            let error = AppError::InternalConsistency(violation);
            warn!(%error, "discarding inconsistent analysis result");
            self.fail_with_prefix(error.to_string(), "");
            return;
        }

        self.analysis = Some(analysis);
        self.item_images = images;
        self.loading_message.clear();
        self.state = AppState::ShowingResult;
    }

    /// `Analyzing -> Error` with the fixed user-facing prefix.
    fn fail(&mut self, message: String) {
        self.fail_with_prefix(message, FAILURE_PREFIX);
    }

    fn fail_with_prefix(&mut self, message: String, prefix: &str) {
        self.analysis = None;
        self.item_images.clear();
        self.loading_message.clear();
        self.error = Some(format!("{}{}", prefix, message));
        self.state = AppState::Error;
    }

    /// Full reset back to `Idle`: clears every session field and bumps the
    /// generation so in-flight work for the old session is ignored when it
    /// lands.
    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.selection = Selection::default();
        self.captured_image = None;
        self.analysis = None;
        self.item_images.clear();
        self.error = None;
        self.loading_message.clear();
        self.generation += 1;
    }

    fn is_live(&self, generation: u64) -> bool {
        if generation != self.generation {
            debug!(
                stale = generation,
                current = self.generation,
                "dropping completion from abandoned session"
            );
            return false;
        }
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the two-phase remote sequence: one analysis call, then one
/// image-generation call per recommendation, issued concurrently and joined
/// in recommendation order.
///
/// `on_item_count` fires between the phases so the UI can update its
/// progress label once the item count is known.
pub async fn run_analysis_pipeline<F>(
    client: &StyleClient,
    request: &AnalysisRequest,
    on_item_count: F,
) -> Result<(AnalysisResult, Vec<Vec<u8>>)>
where
    F: FnOnce(usize),
{
    let analysis = client
        .analyze(&request.image, request.gender, request.occasion)
        .await?;

    on_item_count(analysis.recommendations.len());

    let images = generate_aligned_images(&analysis.recommendations, |item| {
        let name = item.item_name.clone();
        async move { client.generate_item_image(&name).await }
    })
    .await?;

    Ok((analysis, images))
}

/// Fans out one generation future per recommendation and joins them all,
/// preserving recommendation order regardless of completion order. Any
/// single failure fails the whole batch; an empty recommendation list skips
/// the fan-out entirely and yields zero images.
pub async fn generate_aligned_images<F, Fut>(
    recommendations: &[RecommendedItem],
    generate: F,
) -> Result<Vec<Vec<u8>>>
where
    F: Fn(&RecommendedItem) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    if recommendations.is_empty() {
        return Ok(Vec::new());
    }

    future::try_join_all(recommendations.iter().map(generate)).await
}

/// Builds the marketplace deep link for a recommended item:
/// `https://www.amazon.com/s?k=<urlencoded "{gender} {itemName}">`.
pub fn marketplace_search_url(gender: Gender, item_name: &str) -> String {
    let query = format!("{} {}", gender, item_name);
    match url::Url::parse_with_params("https://www.amazon.com/s", &[("k", query.as_str())]) {
        Ok(url) => url.into(),
        // Static base plus encoded query cannot fail to parse; keep a plain
        // fallback rather than panicking in a render path.
        Err(_) => format!("https://www.amazon.com/s?k={}", query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn item(name: &str) -> RecommendedItem {
        RecommendedItem {
            item_name: name.to_string(),
            category: "Accessory".to_string(),
            reason: "matches".to_string(),
        }
    }

    fn analysis(names: &[&str]) -> AnalysisResult {
        AnalysisResult {
            style_analysis: "Great casual fit".to_string(),
            recommendations: names.iter().map(|n| item(n)).collect(),
        }
    }

    fn ready_session() -> Session {
        let mut session = Session::new();
        session.set_gender(Gender::Male);
        session.set_occasion(Occasion::Casual);
        assert!(session.activate_camera());
        session
    }

    #[test]
    fn start_disabled_until_selection_complete() {
        let mut session = Session::new();
        assert!(!session.can_start());
        assert!(!session.activate_camera());
        assert_eq!(session.state(), AppState::Idle);

        session.set_gender(Gender::Female);
        assert!(!session.can_start());

        session.set_occasion(Occasion::Party);
        assert!(session.can_start());
        assert!(session.activate_camera());
        assert_eq!(session.state(), AppState::CameraActive);
    }

    #[test]
    fn capture_moves_to_analyzing_with_selection_intact() {
        let mut session = ready_session();
        let request = session.submit_capture(vec![1, 2, 3]).unwrap();

        assert_eq!(session.state(), AppState::Analyzing);
        assert_eq!(session.loading_message(), "Analyzing your style...");
        assert_eq!(session.captured_image(), Some(&[1u8, 2, 3][..]));
        assert_eq!(request.gender, Gender::Male);
        assert_eq!(request.occasion, Occasion::Casual);
        assert_eq!(session.selection().gender, Some(Gender::Male));
        assert_eq!(session.selection().occasion, Some(Occasion::Casual));
    }

    #[test]
    fn capture_without_selection_is_a_defensive_error() {
        // Force CameraActive with an empty selection to exercise the guard;
        // the UI affordances normally make this unreachable.
        let mut session = ready_session();
        session.selection = Selection::default();

        assert!(session.submit_capture(vec![0]).is_none());
        assert_eq!(session.state(), AppState::Error);
        assert_eq!(
            session.error(),
            Some("Please select a gender and occasion before capturing.")
        );
    }

    #[test]
    fn selection_frozen_outside_idle() {
        let mut session = ready_session();
        session.set_gender(Gender::Female);
        assert_eq!(session.selection().gender, Some(Gender::Male));
    }

    #[test]
    fn happy_path_reaches_showing_result_with_aligned_data() {
        let mut session = ready_session();
        let request = session.submit_capture(b"jpeg".to_vec()).unwrap();

        session.apply_event(PipelineEvent::AnalysisReady {
            generation: request.generation,
            item_count: 3,
        });
        assert_eq!(session.loading_message(), "Creating 3 recommendations...");

        session.apply_event(PipelineEvent::Completed {
            generation: request.generation,
            analysis: analysis(&["white sneakers", "denim jacket", "leather belt"]),
            images: vec![b"img0".to_vec(), b"img1".to_vec(), b"img2".to_vec()],
        });

        assert_eq!(session.state(), AppState::ShowingResult);
        let result = session.analysis().unwrap();
        assert_eq!(result.recommendations.len(), 3);
        assert_eq!(session.item_images().len(), 3);
        assert_eq!(session.item_images()[1], b"img1");
        assert_eq!(result.recommendations[1].item_name, "denim jacket");
    }

    #[test]
    fn pipeline_failure_carries_prefixed_message_and_no_partial_images() {
        let mut session = ready_session();
        let request = session.submit_capture(b"jpeg".to_vec()).unwrap();

        session.apply_event(PipelineEvent::Failed {
            generation: request.generation,
            message: "Gemini API error: boom".to_string(),
        });

        assert_eq!(session.state(), AppState::Error);
        assert!(session.item_images().is_empty());
        assert!(session.analysis().is_none());
        assert_eq!(
            session.error(),
            Some("Failed to get recommendation. Please try again. Details: Gemini API error: boom")
        );
    }

    #[test]
    fn mismatched_image_count_is_an_explicit_consistency_error() {
        let mut session = ready_session();
        let request = session.submit_capture(b"jpeg".to_vec()).unwrap();

        session.apply_event(PipelineEvent::Completed {
            generation: request.generation,
            analysis: analysis(&["a", "b", "c"]),
            images: vec![b"only-one".to_vec()],
        });

        assert_eq!(session.state(), AppState::Error);
        assert!(session.error().unwrap().contains("Internal consistency error"));
        assert!(session.item_images().is_empty());
    }

    #[test]
    fn empty_recommendation_list_still_reaches_showing_result() {
        let mut session = ready_session();
        let request = session.submit_capture(b"jpeg".to_vec()).unwrap();

        session.apply_event(PipelineEvent::Completed {
            generation: request.generation,
            analysis: analysis(&[]),
            images: Vec::new(),
        });

        assert_eq!(session.state(), AppState::ShowingResult);
        assert!(session.item_images().is_empty());
    }

    #[test]
    fn reset_clears_every_field_from_any_state() {
        let mut session = ready_session();
        let request = session.submit_capture(b"jpeg".to_vec()).unwrap();
        session.apply_event(PipelineEvent::Completed {
            generation: request.generation,
            analysis: analysis(&["a", "b", "c"]),
            images: vec![vec![0], vec![1], vec![2]],
        });
        assert_eq!(session.state(), AppState::ShowingResult);

        session.reset();

        assert_eq!(session.state(), AppState::Idle);
        assert_eq!(session.selection(), Selection::default());
        assert!(session.captured_image().is_none());
        assert!(session.analysis().is_none());
        assert!(session.item_images().is_empty());
        assert!(session.error().is_none());
        assert!(session.loading_message().is_empty());
    }

    #[test]
    fn stale_completion_after_reset_is_dropped() {
        let mut session = ready_session();
        let request = session.submit_capture(b"jpeg".to_vec()).unwrap();
        let stale_generation = request.generation;

        session.reset();

        session.apply_event(PipelineEvent::Completed {
            generation: stale_generation,
            analysis: analysis(&["a", "b", "c"]),
            images: vec![vec![0], vec![1], vec![2]],
        });
        session.apply_event(PipelineEvent::Failed {
            generation: stale_generation,
            message: "late failure".to_string(),
        });

        assert_eq!(session.state(), AppState::Idle);
        assert!(session.analysis().is_none());
        assert!(session.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_issues_one_call_per_item_and_preserves_order() {
        let recommendations = vec![item("first"), item("second"), item("third")];
        let calls = AtomicUsize::new(0);

        // Later items finish first; output must still follow input order.
        let images = generate_aligned_images(&recommendations, |rec| {
            calls.fetch_add(1, Ordering::SeqCst);
            let name = rec.item_name.clone();
            let delay = match name.as_str() {
                "first" => 30,
                "second" => 20,
                _ => 10,
            };
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(format!("img:{}", name).into_bytes())
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(images[0], b"img:first");
        assert_eq!(images[1], b"img:second");
        assert_eq!(images[2], b"img:third");
    }

    #[tokio::test]
    async fn fan_out_fails_as_a_whole_when_one_call_fails() {
        let recommendations = vec![item("ok"), item("broken"), item("fine")];

        let result = generate_aligned_images(&recommendations, |rec| {
            let name = rec.item_name.clone();
            async move {
                if name == "broken" {
                    Err(AppError::NoImageGenerated(name))
                } else {
                    Ok(b"img".to_vec())
                }
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::NoImageGenerated(_))));
    }

    #[tokio::test]
    async fn fan_out_skips_generation_for_empty_list() {
        let calls = AtomicUsize::new(0);
        let images = generate_aligned_images(&[], |_rec| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Vec::new()) }
        })
        .await
        .unwrap();

        assert!(images.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn search_url_encodes_gender_and_item() {
        let url = marketplace_search_url(Gender::Male, "white sneakers");
        assert_eq!(url, "https://www.amazon.com/s?k=Male+white+sneakers");
    }
}
