//! The editing session: owner of every photo and of all background work.
//!
//! A [`Session`] is the single writer of the photo collection. Expensive
//! work (decoding, detection, reconciliation, rendering) runs as jobs on a
//! [rayon](https://docs.rs/rayon) pool against immutable snapshots, and each
//! job reports back over an `mpsc` channel. Nothing touches the collection
//! until the owner drains that channel with [`Session::poll`] (non-blocking)
//! or [`Session::wait_idle`] (blocking).
//!
//! ## Job kinds
//!
//! | Job | Trigger | Result applied as |
//! |-----|---------|-------------------|
//! | Load | [`Session::load_photos`] | replaces the photo list |
//! | Re-detect | threshold change, [`Session::request_redetection`] | replaces the photo list |
//! | Re-render all | any other settings change | per-photo render |
//! | Render one | every target edit | per-photo render |
//!
//! ## Staleness
//!
//! Every job gets a generation number from one counter. A collection result
//! older than the last applied collection result is dropped. A render is
//! dropped when its photo has had a newer render requested, when its index
//! is out of range, or when a different photo now sits at that index.
//! Applying a collection result supersedes every render still in flight,
//! since the collection carries its own renders.
//!
//! A settings change that arrives while a load is in flight is held back
//! and replayed once the loaded photos are applied.

use crate::config::{EditorConfig, ExportConfig, effective_threads};
use crate::detect::{DetectorError, FaceDetector, detect_targets};
use crate::export::{ExportError, ExportRequest, ExportSink, FileExportSink};
use crate::geometry::Point;
use crate::imaging::{BackendError, BlurFilter, JpegQuality};
use crate::photo::{EditablePhoto, PhotoId, PhotoSource};
use crate::reconcile::reconcile;
use crate::render::render;
use crate::settings::{BlurSettings, ExportOptions, SettingsChange};
use crate::target::{BlurTarget, TargetId};
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single source could not become a photo.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not decode photo: {0}")]
    Decode(#[from] BackendError),
    #[error("photo has no pixels")]
    Empty,
}

/// A user-facing notice. Never fatal; the session keeps working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAlert {
    /// None of the picked photos could be decoded.
    LoadFailed,
    /// Some photos ended up without any face targets.
    NoFacesDetected { photos: usize },
    SaveCompleted,
    SaveFailed(String),
}

impl SessionAlert {
    pub fn title(&self) -> &'static str {
        match self {
            SessionAlert::LoadFailed => "Load error",
            SessionAlert::NoFacesDetected { .. } => "No faces found",
            SessionAlert::SaveCompleted => "Saved",
            SessionAlert::SaveFailed(_) => "Save error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            SessionAlert::LoadFailed => "The photos could not be loaded.".to_string(),
            SessionAlert::NoFacesDetected { photos } => format!(
                "No faces were detected in {} photo(s). Add manual blur where needed.",
                photos
            ),
            SessionAlert::SaveCompleted => "The photo was saved.".to_string(),
            SessionAlert::SaveFailed(reason) => reason.clone(),
        }
    }
}

// =============================================================================
// Jobs
// =============================================================================

enum JobOutput {
    Loaded {
        photos: Vec<EditablePhoto>,
        requested: usize,
    },
    Redetected {
        photos: Vec<EditablePhoto>,
        failed: usize,
        /// Settings the photos were rendered with.
        settings: BlurSettings,
    },
    Rendered {
        index: usize,
        photo: PhotoId,
        image: Arc<DynamicImage>,
    },
    RenderedAll {
        images: Vec<(PhotoId, Arc<DynamicImage>)>,
    },
}

struct JobResult {
    generation: u64,
    output: JobOutput,
}

/// Decode, detect and render one source.
fn load_photo(
    source: PhotoSource,
    detector: &dyn FaceDetector,
    filter: &dyn BlurFilter,
    settings: &BlurSettings,
) -> Result<EditablePhoto, LoadError> {
    let (image, metadata) = source.decode()?;
    if image.width() == 0 || image.height() == 0 {
        return Err(LoadError::Empty);
    }
    let original = Arc::new(image);
    let targets = detect_or_empty(detector, &original, settings.detection_threshold)
        .unwrap_or_default();

    let mut photo = EditablePhoto::new(original, metadata.map(Arc::new), targets);
    let processed = render(&photo.original, photo.targets(), settings, filter);
    photo.set_processed(processed);
    Ok(photo)
}

/// Detection that degrades to "no faces" on detector failure. The error is
/// logged and handed back so callers can count failures.
fn detect_or_empty(
    detector: &dyn FaceDetector,
    image: &DynamicImage,
    threshold: f64,
) -> Result<Vec<BlurTarget>, DetectorError> {
    detect_targets(detector, image, threshold).inspect_err(|e| {
        warn!(error = %e, "face detection failed, continuing without faces");
    })
}

// =============================================================================
// Builder
// =============================================================================

/// Configures and starts a [`Session`].
pub struct SessionBuilder {
    detector: Arc<dyn FaceDetector>,
    filter: Arc<dyn BlurFilter>,
    settings: BlurSettings,
    export: ExportConfig,
    threads: Option<usize>,
}

impl SessionBuilder {
    /// Take settings, export options and thread count from a loaded config.
    pub fn config(mut self, config: &EditorConfig) -> Self {
        self.settings = config.blur.clamped();
        self.export = config.export;
        self.threads = Some(effective_threads(&config.processing));
        self
    }

    pub fn settings(mut self, settings: BlurSettings) -> Self {
        self.settings = settings.clamped();
        self
    }

    pub fn export_options(mut self, options: ExportOptions) -> Self {
        self.export.remove_metadata = options.remove_metadata;
        self
    }

    /// Worker thread count. Defaults to one per core.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn build(self) -> Result<Session, SessionError> {
        let threads = self
            .threads
            .unwrap_or_else(|| effective_threads(&Default::default()));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("face-blur-{}", i))
            .build()?;
        let (sender, receiver) = mpsc::channel();

        debug!(threads, "session started");
        Ok(Session {
            photos: Vec::new(),
            current_index: 0,
            settings: self.settings,
            export: self.export,
            alerts: VecDeque::new(),
            detector: self.detector,
            filter: self.filter,
            pool,
            sender,
            receiver,
            next_generation: 1,
            collection_applied: 0,
            render_requested: HashMap::new(),
            in_flight: 0,
            pending_load: None,
            deferred_change: SettingsChange::Unchanged,
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// One editing session: loaded photos, current settings and pending work.
pub struct Session {
    photos: Vec<EditablePhoto>,
    current_index: usize,
    settings: BlurSettings,
    export: ExportConfig,
    alerts: VecDeque<SessionAlert>,
    detector: Arc<dyn FaceDetector>,
    filter: Arc<dyn BlurFilter>,
    pool: rayon::ThreadPool,
    sender: Sender<JobResult>,
    receiver: Receiver<JobResult>,
    next_generation: u64,
    /// Generation of the last applied collection result.
    collection_applied: u64,
    /// Latest render generation requested per photo.
    render_requested: HashMap<PhotoId, u64>,
    in_flight: usize,
    pending_load: Option<u64>,
    /// Settings change held back while a load is in flight.
    deferred_change: SettingsChange,
}

impl Session {
    pub fn builder(detector: Arc<dyn FaceDetector>, filter: Arc<dyn BlurFilter>) -> SessionBuilder {
        SessionBuilder {
            detector,
            filter,
            settings: BlurSettings::default(),
            export: ExportConfig::default(),
            threads: None,
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn photos(&self) -> &[EditablePhoto] {
        &self.photos
    }

    pub fn photo(&self, index: usize) -> Option<&EditablePhoto> {
        self.photos.get(index)
    }

    pub fn current_photo(&self) -> Option<&EditablePhoto> {
        self.photos.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Switch the photo being edited. Out-of-range indices are ignored.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index < self.photos.len() {
            self.current_index = index;
            true
        } else {
            false
        }
    }

    pub fn has_loaded_photos(&self) -> bool {
        !self.photos.is_empty()
    }

    /// True while a load is running.
    pub fn is_processing(&self) -> bool {
        self.pending_load.is_some()
    }

    /// True while any job result has yet to be received.
    pub fn has_pending_jobs(&self) -> bool {
        self.in_flight > 0
    }

    pub fn settings(&self) -> &BlurSettings {
        &self.settings
    }

    pub fn export_options(&self) -> ExportOptions {
        self.export.options()
    }

    pub fn set_export_options(&mut self, options: ExportOptions) {
        self.export.remove_metadata = options.remove_metadata;
    }

    /// Next pending alert, oldest first.
    pub fn take_alert(&mut self) -> Option<SessionAlert> {
        self.alerts.pop_front()
    }

    // -------------------------------------------------------------------------
    // Loading and settings
    // -------------------------------------------------------------------------

    /// Replace the session's photos with `sources`, decoded, detected and
    /// rendered in the background. An empty list is ignored.
    pub fn load_photos(&mut self, sources: Vec<PhotoSource>) {
        if sources.is_empty() {
            return;
        }
        self.photos.clear();
        self.current_index = 0;
        self.render_requested.clear();

        let generation = self.next_generation();
        self.pending_load = Some(generation);
        // Re-detections of the previous photos must not land after the clear
        self.collection_applied = generation;
        let requested = sources.len();
        let detector = Arc::clone(&self.detector);
        let filter = Arc::clone(&self.filter);
        let settings = self.settings;

        info!(photos = requested, generation, "loading photos");
        self.spawn(generation, move || {
            let photos: Vec<EditablePhoto> = sources
                .into_par_iter()
                .filter_map(|source| {
                    load_photo(source, &*detector, &*filter, &settings)
                        .inspect_err(|e| warn!(error = %e, "skipping photo"))
                        .ok()
                })
                .collect();
            JobOutput::Loaded { photos, requested }
        });
    }

    /// Adopt new settings (clamped). A threshold change re-detects every
    /// photo; any other change re-renders every photo.
    pub fn set_settings(&mut self, settings: BlurSettings) -> SettingsChange {
        let settings = settings.clamped();
        let change = settings.change_from(&self.settings);
        self.settings = settings;

        if self.pending_load.is_some() {
            self.deferred_change = self.deferred_change.max(change);
            return change;
        }
        match change {
            SettingsChange::Redetect => self.schedule_redetection(),
            SettingsChange::Rerender => self.schedule_rerender_all(),
            SettingsChange::Unchanged => {}
        }
        change
    }

    /// Detect faces again on every photo, keeping the user's choices for
    /// faces that are found again.
    pub fn request_redetection(&mut self) {
        if self.pending_load.is_some() {
            self.deferred_change = SettingsChange::Redetect;
        } else {
            self.schedule_redetection();
        }
    }

    /// Drop every photo and forget all pending work.
    pub fn reset(&mut self) {
        self.photos.clear();
        self.current_index = 0;
        self.render_requested.clear();
        self.pending_load = None;
        self.deferred_change = SettingsChange::Unchanged;
        // Everything in flight is now older than the last applied collection
        self.collection_applied = self.next_generation();
        debug!("session reset");
    }

    // -------------------------------------------------------------------------
    // Target edits
    // -------------------------------------------------------------------------

    /// Flip a target's blurred flag on any photo.
    pub fn toggle_target(&mut self, photo: PhotoId, target: TargetId) -> bool {
        let Some(index) = self.photos.iter().position(|p| p.id == photo) else {
            return false;
        };
        self.edit_photo(index, |p| p.toggle_target(target))
    }

    /// Blur or unblur every target of the current photo.
    pub fn set_all_targets_blurred(&mut self, blurred: bool) -> bool {
        self.edit_photo(self.current_index, |p| {
            p.set_all_blurred(blurred);
            true
        })
    }

    /// Place a manual target on the current photo at an image point.
    pub fn add_manual_target(&mut self, point: Point) -> Option<TargetId> {
        let mut placed = None;
        self.edit_photo(self.current_index, |p| {
            placed = Some(p.add_manual_target(point));
            true
        });
        placed
    }

    pub fn manual_target_radius(&self, target: TargetId) -> Option<f64> {
        self.current_photo()?.manual_target_radius(target)
    }

    /// Allowed manual radii for `photo`, or for the current photo.
    pub fn manual_radius_range(&self, photo: Option<&EditablePhoto>) -> Option<RangeInclusive<f64>> {
        photo
            .or_else(|| self.current_photo())
            .map(EditablePhoto::manual_radius_range)
    }

    pub fn update_manual_target_radius(&mut self, target: TargetId, radius: f64) -> bool {
        self.edit_photo(self.current_index, |p| {
            p.update_manual_target_radius(target, radius)
        })
    }

    pub fn remove_manual_target(&mut self, target: TargetId) -> bool {
        self.edit_photo(self.current_index, |p| p.remove_manual_target(target))
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// A file sink using the configured JPEG quality.
    pub fn file_sink(&self, path: impl Into<PathBuf>) -> FileExportSink {
        FileExportSink::new(path).with_quality(JpegQuality::new(self.export.jpeg_quality))
    }

    /// Save the current photo. The outcome is also queued as an alert.
    ///
    /// A photo whose render is still pending is saved once the worker pool
    /// delivers it, so an edit is never saved unblurred.
    pub fn save_current(&mut self, sink: &dyn ExportSink) -> Result<(), ExportError> {
        let result = self.save_current_inner(sink);
        match &result {
            Ok(()) => self.alerts.push_back(SessionAlert::SaveCompleted),
            Err(e) => {
                warn!(error = %e, "save failed");
                self.alerts.push_back(SessionAlert::SaveFailed(e.to_string()));
            }
        }
        result
    }

    fn save_current_inner(&mut self, sink: &dyn ExportSink) -> Result<(), ExportError> {
        self.await_current_render();
        let photo = self
            .photos
            .get(self.current_index)
            .ok_or(ExportError::NoImage)?;
        let request = ExportRequest::from_photo(photo, &self.export.options());
        sink.save(&request)
    }

    /// Apply results until the current photo has a render that matches its
    /// targets. Rendering stays on the pool.
    fn await_current_render(&mut self) {
        loop {
            match self.photos.get(self.current_index) {
                Some(photo) if photo.processed().is_none() => {}
                _ => return,
            }
            if self.in_flight == 0 {
                self.schedule_render(self.current_index);
            }
            debug!(index = self.current_index, "waiting for render before save");
            match self.receiver.recv() {
                Ok(result) => self.apply(result),
                Err(_) => return,
            }
        }
    }

    // -------------------------------------------------------------------------
    // Applying results
    // -------------------------------------------------------------------------

    /// Apply every result that has already arrived. Returns how many were
    /// received.
    pub fn poll(&mut self) -> usize {
        let mut received = 0;
        while let Ok(result) = self.receiver.try_recv() {
            self.apply(result);
            received += 1;
        }
        received
    }

    /// Block until every submitted job has reported back.
    pub fn wait_idle(&mut self) {
        while self.in_flight > 0 {
            match self.receiver.recv() {
                Ok(result) => self.apply(result),
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, result: JobResult) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let generation = result.generation;

        match result.output {
            JobOutput::Loaded { photos, requested } => {
                match self.pending_load {
                    Some(pending) if generation < pending => {
                        debug!(generation, pending, "dropping superseded load");
                        return;
                    }
                    Some(pending) if generation == pending => self.pending_load = None,
                    _ => {}
                }
                if !self.accept_collection(generation) {
                    return;
                }
                info!(loaded = photos.len(), requested, "photos loaded");
                let faceless = photos.iter().filter(|p| p.targets().is_empty()).count();
                let loaded = photos.len();
                self.replace_photos(photos);

                if loaded == 0 {
                    self.alerts.push_back(SessionAlert::LoadFailed);
                } else if faceless > 0 {
                    self.alerts
                        .push_back(SessionAlert::NoFacesDetected { photos: faceless });
                }
                if self.pending_load.is_none() {
                    self.replay_deferred_change();
                }
            }
            JobOutput::Redetected {
                photos,
                failed,
                settings,
            } => {
                if !self.accept_collection(generation) {
                    return;
                }
                info!(photos = photos.len(), failed, "faces re-detected");
                self.replace_photos(photos);
                // A newer threshold already has its own re-detection in flight
                if self.settings.change_from(&settings) == SettingsChange::Rerender {
                    debug!(generation, "re-detection rendered with stale settings");
                    self.schedule_rerender_all();
                }
                if failed > 0 {
                    self.alerts
                        .push_back(SessionAlert::NoFacesDetected { photos: failed });
                }
            }
            JobOutput::Rendered {
                index,
                photo,
                image,
            } => {
                if index >= self.photos.len() || self.photos[index].id != photo {
                    debug!(index, %photo, "dropping render for a photo no longer present");
                    return;
                }
                self.apply_render(index, generation, image);
            }
            JobOutput::RenderedAll { images } => {
                for (photo, image) in images {
                    if let Some(index) = self.photos.iter().position(|p| p.id == photo) {
                        self.apply_render(index, generation, image);
                    }
                }
            }
        }
    }

    fn accept_collection(&mut self, generation: u64) -> bool {
        if generation < self.collection_applied {
            debug!(generation, applied = self.collection_applied, "dropping stale collection result");
            return false;
        }
        self.collection_applied = generation;
        true
    }

    fn apply_render(&mut self, index: usize, generation: u64, image: Arc<DynamicImage>) {
        let photo = &mut self.photos[index];
        let latest = self.render_requested.get(&photo.id).copied().unwrap_or(0);
        if generation < latest || generation < self.collection_applied {
            debug!(generation, latest, photo = %photo.id, "dropping superseded render");
            return;
        }
        photo.set_processed(image);
    }

    /// Wholesale replacement; in-flight renders are superseded.
    fn replace_photos(&mut self, photos: Vec<EditablePhoto>) {
        let generation = self.next_generation();
        self.render_requested = photos.iter().map(|p| (p.id, generation)).collect();
        self.photos = photos;
        if self.current_index >= self.photos.len() {
            self.current_index = self.photos.len().saturating_sub(1);
        }
    }

    fn replay_deferred_change(&mut self) {
        match std::mem::replace(&mut self.deferred_change, SettingsChange::Unchanged) {
            SettingsChange::Redetect => self.schedule_redetection(),
            SettingsChange::Rerender => self.schedule_rerender_all(),
            SettingsChange::Unchanged => {}
        }
    }

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------

    fn next_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn spawn(&mut self, generation: u64, job: impl FnOnce() -> JobOutput + Send + 'static) {
        self.in_flight += 1;
        let sender = self.sender.clone();
        self.pool.spawn(move || {
            let output = job();
            // The session may have been dropped; nothing left to update
            let _ = sender.send(JobResult { generation, output });
        });
    }

    /// Run `edit` on the photo at `index`; when it reports a change, schedule
    /// a fresh render of that photo.
    fn edit_photo(&mut self, index: usize, edit: impl FnOnce(&mut EditablePhoto) -> bool) -> bool {
        let Some(photo) = self.photos.get_mut(index) else {
            return false;
        };
        let changed = edit(photo);
        if changed {
            self.schedule_render(index);
        }
        changed
    }

    fn schedule_render(&mut self, index: usize) {
        let Some(photo) = self.photos.get(index) else {
            return;
        };
        let snapshot = photo.clone();
        let generation = self.next_generation();
        self.render_requested.insert(snapshot.id, generation);
        let filter = Arc::clone(&self.filter);
        let settings = self.settings;

        self.spawn(generation, move || {
            let image = render(&snapshot.original, snapshot.targets(), &settings, &*filter);
            JobOutput::Rendered {
                index,
                photo: snapshot.id,
                image,
            }
        });
    }

    fn schedule_rerender_all(&mut self) {
        if self.photos.is_empty() {
            return;
        }
        let snapshot = self.photos.clone();
        let generation = self.next_generation();
        for photo in &snapshot {
            self.render_requested.insert(photo.id, generation);
        }
        let filter = Arc::clone(&self.filter);
        let settings = self.settings;

        debug!(photos = snapshot.len(), generation, "re-rendering all photos");
        self.spawn(generation, move || {
            let images = snapshot
                .par_iter()
                .map(|p| (p.id, render(&p.original, p.targets(), &settings, &*filter)))
                .collect();
            JobOutput::RenderedAll { images }
        });
    }

    fn schedule_redetection(&mut self) {
        if self.photos.is_empty() {
            return;
        }
        let snapshot = self.photos.clone();
        let generation = self.next_generation();
        let detector = Arc::clone(&self.detector);
        let filter = Arc::clone(&self.filter);
        let settings = self.settings;

        debug!(photos = snapshot.len(), generation, "re-detecting faces");
        self.spawn(generation, move || {
            let outcomes: Vec<(EditablePhoto, bool)> = snapshot
                .into_par_iter()
                .map(|mut photo| {
                    let detected =
                        detect_or_empty(&*detector, &photo.original, settings.detection_threshold);
                    let failed = detected.is_err();
                    let targets = reconcile(detected.unwrap_or_default(), photo.targets());
                    photo.replace_targets(targets);
                    let processed = render(&photo.original, photo.targets(), &settings, &*filter);
                    photo.set_processed(processed);
                    (photo, failed)
                })
                .collect();
            let failed = outcomes.iter().filter(|(_, failed)| *failed).count();
            let photos = outcomes.into_iter().map(|(photo, _)| photo).collect();
            JobOutput::Redetected {
                photos,
                failed,
                settings,
            }
        });
    }
}
