// Preview scheduling - coalesces rapid parameter changes into a bounded
// rate of renders, at most one in flight, latest request wins.
use image::RgbaImage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::watermark::{WatermarkError, WatermarkSpec};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Renders one preview frame for a spec snapshot. Implementations capture
/// whatever source image the preview is showing; the scheduler only knows
/// about specs.
pub trait PreviewRenderer: Send + Sync + 'static {
    fn render(&self, spec: &WatermarkSpec) -> Result<RgbaImage, WatermarkError>;
}

impl<F> PreviewRenderer for F
where
    F: Fn(&WatermarkSpec) -> Result<RgbaImage, WatermarkError> + Send + Sync + 'static,
{
    fn render(&self, spec: &WatermarkSpec) -> Result<RgbaImage, WatermarkError> {
        self(spec)
    }
}

/// Completion of one preview render. `generation` identifies the request
/// that produced it; frames for superseded requests are never delivered.
#[derive(Debug)]
pub enum PreviewEvent {
    Frame { generation: u64, image: RgbaImage },
    Failed {
        generation: u64,
        error: WatermarkError,
    },
}

struct SchedulerState {
    latest: Option<WatermarkSpec>,
    latest_generation: u64,
    /// Generation of the most recently started render.
    started_generation: u64,
    in_flight: bool,
    recheck_scheduled: bool,
    last_completed: Option<Instant>,
}

struct Inner {
    renderer: Arc<dyn PreviewRenderer>,
    events: mpsc::UnboundedSender<PreviewEvent>,
    debounce: Duration,
    state: Mutex<SchedulerState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Debounced, single-flight preview regeneration.
///
/// [`request_preview`](Self::request_preview) is fire-and-forget: a call
/// renders immediately when nothing is in flight and the debounce window
/// has elapsed since the last completed render; otherwise at most one
/// deferred re-check is kept pending, so bursts of requests collapse to
/// the first render plus one trailing render of the newest spec. A render
/// whose spec was superseded while it ran completes normally but its
/// result is discarded at delivery. Must be used from within a tokio
/// runtime.
pub struct PreviewScheduler {
    inner: Arc<Inner>,
}

impl PreviewScheduler {
    pub fn new(
        renderer: Arc<dyn PreviewRenderer>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PreviewEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            renderer,
            events,
            debounce,
            state: Mutex::new(SchedulerState {
                latest: None,
                latest_generation: 0,
                started_generation: 0,
                in_flight: false,
                recheck_scheduled: false,
                last_completed: None,
            }),
        });
        (Self { inner }, receiver)
    }

    /// Ask for a preview of `spec`. Returns the request's generation, which
    /// matches the `generation` of the event it produces (if any event is
    /// produced at all - superseded requests render at most once as part of
    /// the trailing render).
    pub fn request_preview(&self, spec: WatermarkSpec) -> u64 {
        let inner = &self.inner;
        let mut state = inner.state();
        state.latest_generation += 1;
        let generation = state.latest_generation;
        state.latest = Some(spec);

        if state.in_flight {
            schedule_recheck(inner, &mut state, inner.debounce);
            return generation;
        }

        match remaining_window(&state, inner.debounce) {
            None => spawn_render(inner, &mut state),
            Some(remaining) => schedule_recheck(inner, &mut state, remaining),
        }
        generation
    }
}

/// Time left in the debounce window, or `None` once it has elapsed.
fn remaining_window(state: &SchedulerState, debounce: Duration) -> Option<Duration> {
    let last = state.last_completed?;
    let elapsed = last.elapsed();
    if elapsed >= debounce {
        None
    } else {
        Some(debounce - elapsed)
    }
}

/// Start rendering the latest spec. Caller holds the state lock.
fn spawn_render(inner: &Arc<Inner>, state: &mut SchedulerState) {
    let Some(spec) = state.latest.clone() else {
        return;
    };
    let generation = state.latest_generation;
    state.in_flight = true;
    state.started_generation = generation;

    let inner = inner.clone();
    tokio::spawn(async move {
        let renderer = inner.renderer.clone();
        let result = tokio::task::spawn_blocking(move || renderer.render(&spec)).await;

        let mut state = inner.state();
        state.in_flight = false;
        state.last_completed = Some(Instant::now());
        let superseded = state.latest_generation != generation;

        match result {
            Ok(Ok(image)) => {
                if superseded {
                    debug!("discarding superseded preview (generation {})", generation);
                } else {
                    let _ = inner.events.send(PreviewEvent::Frame { generation, image });
                }
            }
            Ok(Err(e)) => {
                error!("preview render failed: {}", e);
                let _ = inner
                    .events
                    .send(PreviewEvent::Failed { generation, error: e });
            }
            Err(join_error) => {
                error!("preview render task aborted: {}", join_error);
            }
        }

        // A newer spec arrived while this render ran; make sure it gets
        // drawn once the window reopens.
        if state.latest_generation > state.started_generation {
            let debounce = inner.debounce;
            schedule_recheck(&inner, &mut state, debounce);
        }
    });
}

/// Arm the single deferred re-check. Caller holds the state lock.
fn schedule_recheck(inner: &Arc<Inner>, state: &mut SchedulerState, delay: Duration) {
    if state.recheck_scheduled {
        return;
    }
    state.recheck_scheduled = true;

    let inner = inner.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut state = inner.state();
        state.recheck_scheduled = false;

        if state.latest_generation <= state.started_generation {
            return; // newest spec already rendered or rendering
        }
        if state.in_flight {
            return; // completion path re-arms the re-check
        }
        match remaining_window(&state, inner.debounce) {
            None => spawn_render(&inner, &mut state),
            Some(remaining) => schedule_recheck(&inner, &mut state, remaining),
        }
    });
}
