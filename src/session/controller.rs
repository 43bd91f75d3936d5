use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use tokio::{sync::broadcast, sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    audio::AudioCue,
    db::Database,
    error::{ModelKind, PracticeError},
    feedback::{FeedbackBus, FeedbackEvent, FeedbackFrame},
    frame::FrameSource,
    hold::HoldState,
    pose::{PoseClass, PoseClassifier, PoseEstimator, PoseMatcher},
    settings::PracticeSettings,
};

use super::loop_worker::{sampling_loop, LoopContext};
use super::recorder::SessionRecorder;

/// Loads the two inference models. Called from a blocking thread.
pub trait ModelLoader: Send + Sync {
    fn load_estimator(&self) -> Result<Arc<dyn PoseEstimator>>;
    fn load_classifier(&self) -> Result<Arc<dyn PoseClassifier>>;
}

#[derive(Clone)]
pub(crate) struct LoadedModels {
    pub estimator: Arc<dyn PoseEstimator>,
    pub matcher: PoseMatcher,
}

/// State shared between the controller and its sampling task.
pub(crate) struct SessionCore {
    pub state: HoldState,
    pub recorder: SessionRecorder,
}

struct Worker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Runtime collaborators a controller drives.
pub struct PracticeDeps {
    pub loader: Arc<dyn ModelLoader>,
    pub frames: Arc<dyn FrameSource>,
    pub audio: Arc<dyn AudioCue>,
    /// `None` skips persistence; completed records are still emitted.
    pub db: Option<Database>,
}

/// Owns one practice session: the target pose, the sampling task, the loaded
/// models and the audio cue. At most one sampling task runs at a time.
pub struct PracticeController {
    settings: PracticeSettings,
    core: Arc<Mutex<SessionCore>>,
    worker: Mutex<Option<Worker>>,
    models: Mutex<Option<LoadedModels>>,
    loader: Arc<dyn ModelLoader>,
    frames: Arc<dyn FrameSource>,
    audio: Arc<dyn AudioCue>,
    feedback: FeedbackBus,
    db: Option<Database>,
    debug: bool,
}

impl PracticeController {
    pub fn new(settings: PracticeSettings, deps: PracticeDeps) -> Self {
        let debug = std::env::var("POSEHOLD_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let core = SessionCore {
            state: HoldState::new(settings.hold_config()),
            recorder: SessionRecorder::new(settings.accuracy_buffer_capacity),
        };

        Self {
            settings,
            core: Arc::new(Mutex::new(core)),
            worker: Mutex::new(None),
            models: Mutex::new(None),
            loader: deps.loader,
            frames: deps.frames,
            audio: deps.audio,
            feedback: FeedbackBus::new(),
            db: deps.db,
            debug,
        }
    }

    pub fn settings(&self) -> &PracticeSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.feedback.subscribe()
    }

    pub async fn snapshot(&self) -> HoldState {
        self.core.lock().await.state.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Loads models if needed and starts sampling for `target`.
    ///
    /// Starting again after a completed hold begins a fresh hold for the new
    /// target. Starting while a hold is still sampling is rejected.
    pub async fn start(&self, target: PoseClass) -> Result<(), PracticeError> {
        if !target.is_selectable() {
            return Err(PracticeError::UnselectablePose(target));
        }

        // Held across model loading so concurrent starts serialize.
        let mut worker_slot = self.worker.lock().await;
        if worker_slot
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
        {
            return Err(PracticeError::AlreadyRunning);
        }
        if let Some(finished) = worker_slot.take() {
            if let Err(err) = finished.handle.await {
                warn!("previous sampling task ended abnormally: {err}");
            }
        }

        let models = self.ensure_models().await?;

        {
            let mut core = self.core.lock().await;
            core.state.begin(target);
            core.recorder.clear();
        }

        let cancel_token = CancellationToken::new();
        let ctx = LoopContext {
            target,
            core: Arc::clone(&self.core),
            models,
            frames: Arc::clone(&self.frames),
            audio: Arc::clone(&self.audio),
            feedback: self.feedback.clone(),
            db: self.db.clone(),
            settings: self.settings.clone(),
            debug: self.debug,
            cancel_token: cancel_token.clone(),
        };
        let handle = tokio::spawn(sampling_loop(ctx));
        *worker_slot = Some(Worker {
            handle,
            cancel_token,
        });

        info!("practice session started for {target}");
        Ok(())
    }

    /// Stops sampling and returns to Idle. Safe to call at any time; the
    /// accuracy buffer and any in-flight result are discarded.
    pub async fn stop(&self) {
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            worker.cancel_token.cancel();
            if let Err(err) = worker.handle.await {
                error!("sampling task failed to join: {err}");
            }
        }

        let frame = {
            let mut core = self.core.lock().await;
            core.state.reset();
            core.recorder.clear();
            FeedbackFrame::from_state(&core.state, None)
        };

        if let Err(err) = self.audio.pause_and_rewind() {
            warn!("failed to pause audio cue: {err:#}");
        }

        self.feedback.emit(FeedbackEvent::Tick(frame));
        self.feedback.emit(FeedbackEvent::Stopped);
    }

    /// Switches the target pose. Everything is reset; sampling resumes for
    /// the new target only if it was running.
    pub async fn select_pose(&self, target: PoseClass) -> Result<(), PracticeError> {
        if !target.is_selectable() {
            return Err(PracticeError::UnselectablePose(target));
        }

        let was_running = self.is_running().await;
        self.stop().await;

        if was_running {
            self.start(target).await
        } else {
            self.core.lock().await.state.target = Some(target);
            Ok(())
        }
    }

    /// Restarts sampling for the current target.
    pub async fn restart(&self) -> Result<(), PracticeError> {
        let target = self
            .core
            .lock()
            .await
            .state
            .target
            .ok_or(PracticeError::NoTarget)?;
        self.stop().await;
        self.start(target).await
    }

    /// Stops sampling and releases the models and the audio device.
    pub async fn dispose(&self) {
        self.stop().await;
        self.models.lock().await.take();
        if let Err(err) = self.audio.stop() {
            warn!("failed to release audio cue: {err:#}");
        }
        info!("practice controller disposed");
    }

    async fn ensure_models(&self) -> Result<LoadedModels, PracticeError> {
        let mut slot = self.models.lock().await;
        if let Some(models) = slot.as_ref() {
            return Ok(models.clone());
        }

        // If the classifier fails, the estimator loaded here is dropped with
        // this frame, so nothing partial survives.
        let loader = Arc::clone(&self.loader);
        let estimator = self
            .load_model(ModelKind::PoseEstimator, move || loader.load_estimator())
            .await?;
        let loader = Arc::clone(&self.loader);
        let classifier = self
            .load_model(ModelKind::PoseClassifier, move || loader.load_classifier())
            .await?;

        let models = LoadedModels {
            estimator,
            matcher: PoseMatcher::new(classifier, self.settings.match_threshold),
        };
        *slot = Some(models.clone());
        info!("pose models loaded");
        Ok(models)
    }

    async fn load_model<T, F>(&self, model: ModelKind, load: F) -> Result<T, PracticeError>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let result = match tokio::task::spawn_blocking(load).await {
            Ok(result) => result,
            Err(join_err) => Err(anyhow::anyhow!("loader task failed: {join_err}")),
        };

        result.map_err(|err| {
            let message = format!("{err:#}");
            error!("failed to load {model} model: {message}");
            self.feedback.emit(FeedbackEvent::ModelError {
                message: message.clone(),
            });
            if let Err(err) = self.audio.stop() {
                warn!("failed to release audio cue: {err:#}");
            }
            PracticeError::ModelLoad { model, message }
        })
    }
}
