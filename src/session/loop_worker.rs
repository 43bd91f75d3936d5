use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    audio::AudioCue,
    db::Database,
    feedback::{FeedbackBus, FeedbackEvent, FeedbackFrame},
    frame::{Frame, FrameSource},
    hold::{HoldEvent, Observation},
    models::SessionRecord,
    pose::{
        accuracy_percent, build_overlay, filter_and_count, normalize, skeleton_from_keypoints,
        Overlay, PoseClass, SkeletonColor,
    },
    settings::PracticeSettings,
};

use super::controller::{LoadedModels, SessionCore};

// Set to false to silence this module's per-tick logging
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub(crate) struct LoopContext {
    pub target: PoseClass,
    pub core: Arc<Mutex<SessionCore>>,
    pub models: LoadedModels,
    pub frames: Arc<dyn FrameSource>,
    pub audio: Arc<dyn AudioCue>,
    pub feedback: FeedbackBus,
    pub db: Option<Database>,
    pub settings: PracticeSettings,
    pub debug: bool,
    pub cancel_token: CancellationToken,
}

/// What one tick's pipeline run concluded, before it touches session state.
struct TickSample {
    observation: Observation,
    overlay: Option<Overlay>,
}

impl TickSample {
    fn undetected(overlay: Option<Overlay>) -> Self {
        Self {
            observation: Observation::Undetected,
            overlay,
        }
    }
}

/// Fixed-period sampling task. Inference for a tick is awaited before the
/// next tick is taken, so at most one request per session is in flight;
/// ticks that fall due meanwhile are skipped. A request that outlives its
/// timeout keeps the inference slot until it returns, and ticks taken in the
/// meantime count as undetected without calling a model.
pub(crate) async fn sampling_loop(ctx: LoopContext) {
    let mut ticker = tokio::time::interval(ctx.settings.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let anchor = Instant::now();
    let inference_slot = Arc::new(Semaphore::new(1));

    log_info!("sampling loop started for {}", ctx.target);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(frame) = ctx.frames.next_frame() else {
                    continue;
                };

                let sample = run_pipeline(&ctx, &inference_slot, frame).await;
                if !apply_sample(&ctx, sample, anchor.elapsed()).await {
                    break;
                }
            }
            _ = ctx.cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
        }
    }

    // Outlive any abandoned inference so stop() never returns with a model
    // call still running.
    if inference_slot.available_permits() == 0 {
        log_info!("waiting for in-flight inference before exiting");
    }
    if inference_slot.acquire().await.is_err() {
        log_warn!("inference slot closed while draining");
    }
}

async fn run_blocking<T, F>(slot: &Arc<Semaphore>, timeout: Duration, task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let permit = Arc::clone(slot)
        .try_acquire_owned()
        .map_err(|_| anyhow!("previous inference still running"))?;

    // The permit travels with the blocking work, not with this future.
    let work = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        task()
    });

    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(anyhow!("inference worker join failed: {join_err}")),
        Err(_) => Err(anyhow!(
            "inference timed out after {}ms",
            timeout.as_millis()
        )),
    }
}

async fn run_pipeline(ctx: &LoopContext, slot: &Arc<Semaphore>, frame: Frame) -> TickSample {
    let timeout = ctx.settings.inference_timeout();
    let score_threshold = ctx.settings.keypoint_score_threshold;

    let estimator = Arc::clone(&ctx.models.estimator);
    let keypoints = match run_blocking(slot, timeout, move || estimator.estimate(&frame)).await {
        Ok(keypoints) => keypoints,
        Err(err) => {
            log_warn!("pose estimation failed: {err:#}");
            return TickSample::undetected(None);
        }
    };

    if keypoints.is_empty() {
        return TickSample::undetected(None);
    }
    let Some(skeleton) = skeleton_from_keypoints(&keypoints) else {
        log_warn!(
            "pose estimator returned {} keypoints that do not form a skeleton",
            keypoints.len()
        );
        return TickSample::undetected(None);
    };

    let gate = filter_and_count(&skeleton, score_threshold);
    if !gate.is_detected(ctx.settings.max_low_confidence) {
        return TickSample::undetected(Some(build_overlay(
            &skeleton,
            score_threshold,
            SkeletonColor::White,
        )));
    }

    let embedding = normalize(&gate.usable);
    let matcher = ctx.models.matcher.clone();
    let target = ctx.target;
    let confidence = match run_blocking(slot, timeout, move || {
        matcher.classify(&embedding, target)
    })
    .await
    {
        Ok(confidence) => confidence,
        Err(err) => {
            log_warn!("pose classification failed: {err:#}");
            return TickSample::undetected(Some(build_overlay(
                &skeleton,
                score_threshold,
                SkeletonColor::White,
            )));
        }
    };

    if ctx.debug {
        log_debug!("{} confidence {:.4}", target, confidence);
    }

    let threshold = ctx.models.matcher.threshold();
    if ctx.models.matcher.is_match(confidence) {
        TickSample {
            observation: Observation::Matched {
                accuracy: accuracy_percent(confidence, threshold),
            },
            overlay: Some(build_overlay(&skeleton, score_threshold, SkeletonColor::Green)),
        }
    } else {
        TickSample {
            observation: Observation::NotMatched,
            overlay: Some(build_overlay(&skeleton, score_threshold, SkeletonColor::White)),
        }
    }
}

/// Feeds one sample into the hold state. Returns false once the loop should
/// end (session completed, or stopped while the sample was in flight).
async fn apply_sample(ctx: &LoopContext, sample: TickSample, now: Duration) -> bool {
    let mut core = ctx.core.lock().await;

    // stop() cancels before it takes the lock, so a result that lands after
    // that point is stale.
    if ctx.cancel_token.is_cancelled() {
        log_info!("discarding tick result that arrived after stop");
        return false;
    }

    let outcome = core.state.tick(sample.observation, now);
    if let Some(accuracy) = outcome.accuracy_sample {
        core.recorder.push(accuracy);
    }

    for event in &outcome.events {
        match event {
            HoldEvent::MatchStarted => {
                if let Err(err) = ctx.audio.play() {
                    log_warn!("failed to start audio cue: {err:#}");
                }
                ctx.feedback.emit(FeedbackEvent::MatchStarted);
            }
            HoldEvent::MatchLost => {
                if let Err(err) = ctx.audio.pause_and_rewind() {
                    log_warn!("failed to pause audio cue: {err:#}");
                }
                ctx.feedback.emit(FeedbackEvent::MatchLost);
            }
            HoldEvent::WarningRaised => ctx.feedback.emit(FeedbackEvent::WarningRaised),
            HoldEvent::WarningCleared => ctx.feedback.emit(FeedbackEvent::WarningCleared),
            HoldEvent::Completed => {}
        }
    }

    if !outcome.has(HoldEvent::Completed) {
        ctx.feedback.emit(FeedbackEvent::Tick(FeedbackFrame::from_state(
            &core.state,
            sample.overlay,
        )));
        return true;
    }

    let record = core.recorder.finalize(ctx.target, Utc::now());
    if let Err(err) = ctx.audio.pause_and_rewind() {
        log_warn!("failed to pause audio cue: {err:#}");
    }
    ctx.feedback
        .emit(FeedbackEvent::Tick(FeedbackFrame::from_state(&core.state, None)));
    ctx.feedback.emit(FeedbackEvent::Completed {
        record: record.clone(),
    });
    drop(core);

    log_info!(
        "{} hold completed: accuracy {} calories {}",
        record.pose,
        record.accuracy,
        record.calories
    );
    persist_record(ctx, &record).await;
    false
}

async fn persist_record(ctx: &LoopContext, record: &SessionRecord) {
    let Some(db) = ctx.db.as_ref() else {
        return;
    };
    if let Err(err) = db.append_session(&ctx.settings.user_id, record).await {
        log_error!("failed to persist session {}: {err:#}", record.id);
    }
}
