//! Frame loop: hands → gesture → volume level → mixer → overlay.
//!
//! `AppState` owns the debounced sink and the per-frame policy.  `run()`
//! wires a landmark source, the state and (unless headless) the visualizer
//! together and drives them once per frame.

use std::fs::File;
use std::io::{self, BufReader, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use hand_pose::{Finger, FingerState, HandPose, ThumbSide, finger_state, pinch_center, pinch_distance};
use pinch_volume::{
    DistanceRange, Mixer, SimulatedMixer, SinkError, SinkOutcome, VolumeLevel, VolumeSink,
    map_distance_to_level,
};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::gesture::{Detection, JsonLinesSource, LandmarkSource, SimHand, SimLandmarkSource};
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// Gesture / FrameReport
// ════════════════════════════════════════════════════════════════════════════

/// How a frame's hand (or its absence) was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// No usable hand in the frame.
    NoHand,
    /// Pinky down, at least three fingers up: the pinch sets the volume.
    Adjust,
    /// No finger up.
    Mute,
    /// A hand is visible but holds neither gesture.
    Idle,
}

impl Gesture {
    pub fn label(self) -> &'static str {
        match self {
            Gesture::NoHand => "no hand",
            Gesture::Adjust => "adjust",
            Gesture::Mute   => "mute",
            Gesture::Idle   => "idle",
        }
    }
}

/// Everything a renderer needs about one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub gesture:        Gesture,
    /// The hand the gesture was read from.
    pub pose:           Option<HandPose>,
    pub pinch_distance: Option<u32>,
    /// Midpoint of the thumb and index tips.
    pub center:         Option<(i32, i32)>,
    pub fingers:        Option<FingerState>,
    /// Level the pinch maps to, whether or not it was applied.
    pub mapped_level:   Option<VolumeLevel>,
    /// Level handed to the sink this frame.
    pub target:         Option<VolumeLevel>,
    /// What the sink did; `None` when nothing was sent or the mixer failed.
    pub outcome:        Option<SinkOutcome>,
}

impl FrameReport {
    fn without_hand(target: Option<VolumeLevel>, outcome: Option<SinkOutcome>) -> Self {
        FrameReport {
            gesture:        Gesture::NoHand,
            pose:           None,
            pinch_distance: None,
            center:         None,
            fingers:        None,
            mapped_level:   None,
            target,
            outcome,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// WarnLimiter — keep a failing mixer from flooding the log
// ════════════════════════════════════════════════════════════════════════════

/// Lets one warning through per `interval`, counting the ones held back.
#[derive(Debug)]
pub struct WarnLimiter {
    interval:   Duration,
    last:       Option<Instant>,
    suppressed: u32,
}

impl WarnLimiter {
    pub fn new(interval: Duration) -> Self {
        WarnLimiter { interval, last: None, suppressed: 0 }
    }

    /// Record a failure at `now`.  Returns `Some(n)` when it should be
    /// logged, `n` being the failures swallowed since the previous log.
    pub fn hit(&mut self, now: Instant) -> Option<u32> {
        match self.last {
            Some(t) if now.duration_since(t) < self.interval => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FpsCounter
// ════════════════════════════════════════════════════════════════════════════

/// Instantaneous frames-per-second from consecutive frame times.
#[derive(Debug, Default)]
pub struct FpsCounter {
    prev: Option<Instant>,
    fps:  f64,
}

impl FpsCounter {
    pub fn tick(&mut self, now: Instant) {
        if let Some(prev) = self.prev {
            let dt = now.duration_since(prev).as_secs_f64();
            if dt > 0.0 {
                self.fps = 1.0 / dt;
            }
        }
        self.prev = Some(now);
    }

    pub fn fps(&self) -> f64 { self.fps }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState<M: Mixer> {
    sink:          VolumeSink<M>,
    range:         DistanceRange,
    scale:         f64,
    thumb_side:    ThumbSide,
    mute_level:    VolumeLevel,
    no_hand_level: Option<VolumeLevel>,
    warn:          WarnLimiter,
}

impl<M: Mixer> AppState<M> {
    pub fn new(cfg: &AppConfig, mixer: M) -> Self {
        AppState {
            sink:          VolumeSink::new(mixer),
            range:         cfg.distance_range(),
            scale:         cfg.scale,
            thumb_side:    cfg.thumb_side(),
            mute_level:    cfg.mute_level(),
            no_hand_level: cfg.no_hand_level(),
            warn:          WarnLimiter::new(Duration::from_millis(cfg.mixer_warn_interval_ms)),
        }
    }

    // ── process one frame ────────────────────────────────────────────────

    /// Interpret the first hand and drive the sink accordingly.
    pub fn process_frame(&mut self, hands: &[HandPose], now: Instant) -> FrameReport {
        let Some(pose) = hands.first() else {
            return self.no_hand(now);
        };

        let distance = match pinch_distance(pose, self.scale) {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "unusable hand, treating frame as empty");
                return self.no_hand(now);
            }
        };

        let fingers = finger_state(pose, self.thumb_side);
        let mapped  = map_distance_to_level(distance, self.range);

        let (gesture, target) =
            if !fingers.is_extended(Finger::Pinky) && fingers.count() > 2 {
                (Gesture::Adjust, Some(mapped))
            } else if fingers.count() == 0 {
                (Gesture::Mute, Some(self.mute_level))
            } else {
                (Gesture::Idle, None)
            };

        let outcome = target.and_then(|level| self.apply(level, now));

        FrameReport {
            gesture,
            pose:           Some(pose.clone()),
            pinch_distance: Some(distance),
            center:         Some(pinch_center(pose)),
            fingers:        Some(fingers),
            mapped_level:   Some(mapped),
            target,
            outcome,
        }
    }

    fn no_hand(&mut self, now: Instant) -> FrameReport {
        let target  = self.no_hand_level;
        let outcome = target.and_then(|level| self.apply(level, now));
        FrameReport::without_hand(target, outcome)
    }

    /// Apply through the sink; mixer failures are logged (rate-limited)
    /// and otherwise ignored so the loop keeps running.
    fn apply(&mut self, level: VolumeLevel, now: Instant) -> Option<SinkOutcome> {
        match self.sink.apply(level) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.report_mixer_error(&e, now);
                None
            }
        }
    }

    fn report_mixer_error(&mut self, err: &SinkError, now: Instant) {
        if let Some(suppressed) = self.warn.hit(now) {
            if suppressed > 0 {
                warn!(error = %err, suppressed, "mixer call failed (further failures suppressed)");
            } else {
                warn!(error = %err, "mixer call failed");
            }
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn sink(&self) -> &VolumeSink<M> { &self.sink }
    pub fn range(&self) -> DistanceRange { self.range }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Where hand detections come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    /// Keyboard/mouse hand simulator (needs the window).
    Sim,
    /// JSON lines of normalized landmarks (file or stdin).
    Jsonl,
}

/// Runtime choices made on the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source:   SourceKind,
    /// Landmark stream path; `None` or `-` reads stdin.
    pub input:    Option<PathBuf>,
    pub headless: bool,
}

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  The mixer is the
/// in-memory [`SimulatedMixer`]; OS mixers plug in through the [`Mixer`]
/// trait.
pub fn run(cfg: AppConfig, opts: RunOptions) -> anyhow::Result<()> {
    let mixer = SimulatedMixer::new(cfg.initial_native_level);
    let mut app = AppState::new(&cfg, mixer);

    if opts.headless {
        if opts.source == SourceKind::Sim {
            bail!("the simulation source needs the window; use --source jsonl with --headless");
        }
        let mut source = open_stream(&cfg, opts.input.as_ref())?;
        return run_headless(&mut app, &mut source);
    }

    // ── Sim input channel ─────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel();
    let (width, height)  = cfg.frame_size();

    let mut source: Box<dyn LandmarkSource> = match opts.source {
        SourceKind::Sim => Box::new(SimLandmarkSource::new(
            sim_rx,
            SimHand::centered(width, height, cfg.scale),
        )),
        SourceKind::Jsonl => Box::new(open_stream(&cfg, opts.input.as_ref())?),
    };

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(sim_tx, width as usize, height as usize, cfg.scale)
        .context("failed to open the visualizer window")?;

    info!(source = source.name(), "hand volume running");

    let mut fps = FpsCounter::default();
    while vis.is_open() {
        if !vis.poll_input() { break; }

        let hands = match source.detect()? {
            Detection::Hands(h) => h,
            Detection::Finished => break,
        };

        let now    = Instant::now();
        let report = app.process_frame(&hands, now);
        fps.tick(now);

        vis.render(&report, app.range(), fps.fps(), source.name());
    }
    Ok(())
}

fn run_headless<M: Mixer>(app: &mut AppState<M>, source: &mut dyn LandmarkSource) -> anyhow::Result<()> {
    info!(source = source.name(), "hand volume running headless");
    let mut frames  = 0u64;
    let mut applied = 0u64;
    while let Detection::Hands(hands) = source.detect()? {
        let report = app.process_frame(&hands, Instant::now());
        frames += 1;
        if report.outcome.is_some_and(SinkOutcome::is_applied) {
            applied += 1;
        }
        debug!(
            frame    = frames,
            gesture  = report.gesture.label(),
            pinch    = ?report.pinch_distance,
            level    = ?report.mapped_level.map(VolumeLevel::percent),
            fingers  = %report.fingers.map(|f| f.to_string()).unwrap_or_default(),
            "frame"
        );
    }
    info!(frames, applied, "landmark stream finished");
    Ok(())
}

fn open_stream(
    cfg: &AppConfig,
    input: Option<&PathBuf>,
) -> anyhow::Result<JsonLinesSource<Box<dyn BufRead>>> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .with_context(|| format!("failed to open landmark stream {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        _ => Box::new(BufReader::new(io::stdin())),
    };
    Ok(JsonLinesSource::new(
        reader,
        cfg.frame_size(),
        cfg.max_hands,
        cfg.min_detection_confidence,
    ))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
