//! # Capture Controller Module
//!
//! The controller walks through the stencils, capturing a frame for the current stencil on each
//! tick and handing it to the acceptance sink, until every stencil has an accepted image.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::DynamicImage;
use log::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{capture_frame, compose_overlay, FrameSource};
use crate::sink::{AcceptanceSink, Event, SinkWorker, Submission, Verdict};
use crate::slots::CaptureSlots;
use crate::stencil::{Stencil, StencilSet};
use crate::view::{CaptureView, SlotView};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Default period between capture ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(4);

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Captures frames against a fixed list of stencils until each has been accepted.
pub struct AutoCapture<S> {
    stencils: StencilSet,

    slots: CaptureSlots,

    /// Slots with a submission outstanding at the sink
    pending: Vec<bool>,

    current: usize,

    interval: Duration,

    overlays: Vec<Option<DynamicImage>>,

    worker: SinkWorker,

    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,

    /// Set while `run` is looping, stop requests are only honoured then
    running: bool,

    stop_requested: bool,

    source: Option<S>,
}

/// Stops a running capture loop from another thread.
#[derive(Clone)]
pub struct Stopper {
    tx: Sender<Event>,
}

/// A capture loop running on its own thread.
pub struct CaptureHandle<S> {
    stopper: Stopper,

    jh: JoinHandle<AutoCapture<S>>,
}

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Every stencil has been accepted, nothing left to do
    Quiescent,

    /// The current slot was already filled, so the index moved on without a capture
    Skipped { from: usize, to: usize },

    /// A submission for this slot is still with the sink
    InFlight(usize),

    /// No frame could be captured this time
    NoFrame,

    /// A frame was handed to the sink for this slot
    Submitted(usize),

    /// The sink worker is no longer accepting submissions
    SinkUnavailable,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl<S: FrameSource> AutoCapture<S> {
    /// Create a new controller.
    ///
    /// A `source` of `None` means no camera could be attached. The controller still works but
    /// never captures anything.
    pub fn new<K: AcceptanceSink>(stencils: StencilSet, source: Option<S>, sink: K) -> Self {
        let (events_tx, events_rx) = channel();
        let worker = SinkWorker::spawn(sink, events_tx.clone());

        let len = stencils.len();

        Self {
            stencils,
            slots: CaptureSlots::new(len),
            pending: vec![false; len],
            current: 0,
            interval: DEFAULT_TICK_INTERVAL,
            overlays: vec![None; len],
            worker,
            events_tx,
            events_rx,
            running: false,
            stop_requested: false,
            source,
        }
    }

    /// Run one capture tick.
    ///
    /// Verdicts which have already come back from the sink are applied first. Failures to
    /// capture are logged and reported as [`TickOutcome::NoFrame`], the same slot is tried again
    /// on the next tick.
    pub fn tick(&mut self) -> TickOutcome {
        self.poll();

        if self.slots.all_filled() {
            return TickOutcome::Quiescent;
        }

        let index = self.current;

        if self.slots.is_filled(index) {
            let to = self.advance();
            debug!("Slot {} already filled, moved on to {}", index, to);
            return TickOutcome::Skipped { from: index, to };
        }

        if self.pending[index] {
            debug!("Slot {} still waiting on the sink", index);
            return TickOutcome::InFlight(index);
        }

        let source = match self.source.as_mut() {
            Some(s) => s,
            None => {
                debug!("No video source attached");
                return TickOutcome::NoFrame;
            }
        };

        let frame = match capture_frame(source) {
            Ok(Some(f)) => f,
            Ok(None) => return TickOutcome::NoFrame,
            Err(e) => {
                warn!("Failed to capture frame for slot {}: {}", index, e);
                return TickOutcome::NoFrame;
            }
        };

        let submission = Submission {
            index,
            frame,
            stencil: self.stencils[index].clone(),
        };

        match self.worker.submit(submission) {
            Ok(()) => {
                self.pending[index] = true;
                debug!("Submitted frame for stencil {}", self.stencils[index].id);
                TickOutcome::Submitted(index)
            },
            Err(e) => {
                error!("Cannot submit frame for slot {}: {}", index, e);
                TickOutcome::SinkUnavailable
            }
        }
    }

    /// Apply a verdict from the sink.
    ///
    /// An accepted image fills its slot and moves the current index on to the next empty slot.
    /// A rejection leaves everything as it was.
    pub fn apply(&mut self, verdict: Verdict) {
        let index = verdict.index;

        if let Some(p) = self.pending.get_mut(index) {
            *p = false;
        }

        let image = match verdict.accepted {
            Some(image) => image,
            None => {
                debug!("Slot {} rejected, will retry", index);
                return;
            }
        };

        if !self.slots.fill(index, image) {
            warn!("Ignoring accepted image for slot {} which is filled or out of range", index);
            return;
        }

        info!(
            "Stencil {} ({}) accepted, {}/{} captured",
            self.stencils[index].id,
            self.stencils[index].name,
            self.slots.filled_count(),
            self.slots.len()
        );

        self.advance();

        if self.slots.all_filled() {
            info!("All {} stencils captured", self.slots.len());
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Verdict(v) => self.apply(v),
            Event::Stop if self.running => self.stop_requested = true,
            Event::Stop => debug!("Ignoring stop request, the capture loop is not running")
        }
    }

    /// Apply any verdicts which have already arrived, without blocking.
    pub fn poll(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
        }
    }

    /// Block until no submission is outstanding at the sink.
    pub fn settle(&mut self) -> Result<()> {
        while self.pending.iter().any(|p| *p) {
            let event = self.events_rx.recv().map_err(|_| Error::ChannelReceiveError)?;
            self.handle(event);
        }

        Ok(())
    }

    /// Run the capture loop on this thread until a [`Stopper`] asks it to stop.
    ///
    /// A tick happens once every `interval`, and the wait starts over whenever the current
    /// stencil changes.
    pub fn run(&mut self) -> Result<()> {
        info!(
            "Capture loop started with {} stencils, ticking every {:?}",
            self.stencils.len(), self.interval
        );

        self.running = true;
        let mut deadline = Instant::now() + self.interval;

        while !self.stop_requested {
            let wait = deadline.saturating_duration_since(Instant::now());
            let before = self.current;

            match self.events_rx.recv_timeout(wait) {
                Ok(event) => {
                    self.handle(event);
                    if self.current != before {
                        deadline = Instant::now() + self.interval;
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    let outcome = self.tick();
                    debug!("Tick: {:?}", outcome);
                    deadline = Instant::now() + self.interval;
                },
                Err(RecvTimeoutError::Disconnected) => {
                    self.running = false;
                    return Err(Error::ChannelReceiveError);
                }
            }
        }

        self.running = false;
        self.stop_requested = false;
        info!("Capture loop stopped");

        Ok(())
    }

    /// A handle which stops [`run`](Self::run).
    pub fn stopper(&self) -> Stopper {
        Stopper { tx: self.events_tx.clone() }
    }

    /// Run the capture loop on a new thread.
    pub fn spawn(self) -> CaptureHandle<S>
    where
        S: Send + 'static
    {
        let stopper = self.stopper();

        let jh = thread::spawn(move || {
            let mut capture = self;
            if let Err(e) = capture.run() {
                error!("Capture loop failed: {}", e);
            }
            capture
        });

        CaptureHandle { stopper, jh }
    }

    /// The rendered state: the current overlay and the gallery of slots.
    pub fn view(&self) -> CaptureView<'_> {
        CaptureView {
            overlay: self.current_stencil(),
            current: self.current,
            slots: self.stencils
                .iter()
                .zip(self.slots.iter())
                .map(|(stencil, image)| SlotView { stencil, image })
                .collect(),
        }
    }

    /// Grab a live frame and draw the current stencil's overlay on top of it.
    ///
    /// Returns `Ok(None)` while there is no video to show.
    pub fn preview(&mut self) -> Result<Option<DynamicImage>> {
        let frame = match self.source.as_mut() {
            Some(s) => s.grab()?,
            None => None
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(None)
        };

        let index = self.current;
        if self.overlays[index].is_none() {
            self.overlays[index] = Some(self.stencils[index].load_overlay()?);
        }

        Ok(self.overlays[index].as_ref().map(|o| compose_overlay(&frame, o)))
    }
}

impl<S> AutoCapture<S> {
    /// Index of the stencil currently being captured.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_stencil(&self) -> &Stencil {
        &self.stencils[self.current]
    }

    pub fn stencils(&self) -> &StencilSet {
        &self.stencils
    }

    pub fn slots(&self) -> &CaptureSlots {
        &self.slots
    }

    /// True once every stencil has an accepted image.
    pub fn is_complete(&self) -> bool {
        self.slots.all_filled()
    }

    /// True if a submission for slot `index` is with the sink.
    pub fn is_pending(&self, index: usize) -> bool {
        self.pending.get(index).copied().unwrap_or(false)
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the period between ticks of [`run`](AutoCapture::run).
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    fn advance(&mut self) -> usize {
        self.current = self.slots.next_empty(self.current);
        self.current
    }
}

impl Stopper {
    /// Ask the loop to stop. Does nothing if the loop has already gone.
    pub fn stop(&self) {
        let _ = self.tx.send(Event::Stop);
    }
}

impl<S> CaptureHandle<S> {
    pub fn stopper(&self) -> Stopper {
        self.stopper.clone()
    }

    /// Stop the loop and hand back the controller.
    pub fn stop(self) -> Result<AutoCapture<S>> {
        self.stopper.stop();

        self.jh.join().map_err(|_| Error::ThreadJoinError)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use std::sync::mpsc::sync_channel;
    use std::sync::{Arc, Mutex};
    use image::{DynamicImage, RgbImage};

    use crate::frame::CapturedFrame;

    struct TestPattern;

    impl FrameSource for TestPattern {
        fn grab(&mut self) -> Result<Option<DynamicImage>> {
            Ok(Some(DynamicImage::ImageRgb8(RgbImage::new(4, 4))))
        }
    }

    /// Fails to capture every other frame
    struct Flaky(bool);

    impl FrameSource for Flaky {
        fn grab(&mut self) -> Result<Option<DynamicImage>> {
            self.0 = !self.0;
            if self.0 {
                Err(Error::CameraCaptureError(std::io::Error::from(std::io::ErrorKind::TimedOut)))
            } else {
                Ok(Some(DynamicImage::ImageRgb8(RgbImage::new(4, 4))))
            }
        }
    }

    fn stencils(n: u32) -> StencilSet {
        StencilSet::new(
            (1..=n).map(|i| Stencil::new(i, format!("Stencil {}", i), "missing.png")).collect()
        ).unwrap()
    }

    fn accept_all(_: &CapturedFrame, stencil: &Stencil) -> Option<String> {
        Some(format!("accepted-{}", stencil.id))
    }

    #[test]
    fn test_apply_fills_and_advances() {
        let mut capture = AutoCapture::new(stencils(3), Some(TestPattern), accept_all);

        capture.apply(Verdict { index: 0, accepted: Some(String::from("a")) });

        assert_eq!(capture.slots().get(0), Some("a"));
        assert_eq!(capture.current(), 1);
    }

    #[test]
    fn test_apply_rejection_keeps_state() {
        let mut capture = AutoCapture::new(stencils(3), Some(TestPattern), accept_all);

        capture.apply(Verdict { index: 0, accepted: None });

        assert_eq!(capture.slots().filled_count(), 0);
        assert_eq!(capture.current(), 0);
    }

    /// Landing on a filled slot moves on without submitting anything
    #[test]
    fn test_filled_slot_skipped() {
        let mut capture = AutoCapture::new(stencils(3), Some(TestPattern), accept_all);

        // Fill slot 1 out of order
        capture.apply(Verdict { index: 1, accepted: Some(String::from("b")) });
        assert_eq!(capture.current(), 2);

        capture.apply(Verdict { index: 2, accepted: Some(String::from("c")) });
        assert_eq!(capture.current(), 0);

        capture.current = 1;
        assert_eq!(capture.tick(), TickOutcome::Skipped { from: 1, to: 0 });
        assert_eq!(capture.current(), 0);
        assert!(!capture.is_pending(1));
    }

    /// A second tick while the sink is still busy does not submit the slot again
    #[test]
    fn test_in_flight_guard() {
        let (gate_tx, gate_rx) = sync_channel::<()>(0);
        let sink = move |_: &CapturedFrame, _: &Stencil| {
            gate_rx.recv().ok();
            Some(String::from("slow"))
        };

        let mut capture = AutoCapture::new(stencils(2), Some(TestPattern), sink);

        assert_eq!(capture.tick(), TickOutcome::Submitted(0));
        assert!(capture.is_pending(0));
        assert_eq!(capture.tick(), TickOutcome::InFlight(0));

        gate_tx.send(()).unwrap();
        capture.settle().unwrap();

        assert!(!capture.is_pending(0));
        assert_eq!(capture.slots().get(0), Some("slow"));
        assert_eq!(capture.current(), 1);
    }

    #[test]
    fn test_capture_errors_are_retried() {
        let mut capture = AutoCapture::new(stencils(1), Some(Flaky(false)), accept_all);

        assert_eq!(capture.tick(), TickOutcome::NoFrame);
        assert_eq!(capture.tick(), TickOutcome::Submitted(0));

        capture.settle().unwrap();
        assert!(capture.is_complete());
        assert_eq!(capture.tick(), TickOutcome::Quiescent);
    }

    #[test]
    fn test_view_tracks_slots() {
        let mut capture = AutoCapture::new(stencils(2), Some(TestPattern), accept_all);

        capture.apply(Verdict { index: 0, accepted: Some(String::from("a")) });

        let view = capture.view();
        assert_eq!(view.current, 1);
        assert_eq!(view.overlay.name, "Stencil 2");
        assert!(!view.slots[0].is_placeholder());
        assert!(view.slots[1].is_placeholder());
    }

    #[test]
    fn test_preview_without_source() {
        let mut capture: AutoCapture<TestPattern> = AutoCapture::new(stencils(2), None, accept_all);

        assert!(capture.preview().unwrap().is_none());
    }

    #[test]
    fn test_preview_missing_overlay() {
        let mut capture = AutoCapture::new(stencils(2), Some(TestPattern), accept_all);

        match capture.preview() {
            Err(Error::OverlayLoadError(id, _, _)) => assert_eq!(id.0, 1),
            other => panic!("Expected OverlayLoadError, got {:?}", other.map(|_| ()))
        }
    }

    /// Stopping a loop which is waiting on a long interval returns straight away
    #[test]
    fn test_stop_long_interval() {
        let mut capture = AutoCapture::new(stencils(2), Some(TestPattern), accept_all);
        capture.set_interval(Duration::from_secs(3600));

        let started = Instant::now();
        let capture = capture.spawn().stop().unwrap();

        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(capture.slots().filled_count(), 0);
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(DEFAULT_TICK_INTERVAL, Duration::from_secs(4));

        let capture = AutoCapture::new(stencils(1), Some(TestPattern), accept_all);
        assert_eq!(capture.interval(), DEFAULT_TICK_INTERVAL);
    }

    /// A stop sent while nothing is looping must not cut the next run short
    #[test]
    fn test_stop_outside_run_ignored() {
        let mut capture = AutoCapture::new(stencils(1), Some(TestPattern), accept_all);
        capture.set_interval(Duration::from_millis(20));

        capture.stopper().stop();
        capture.poll();
        capture.stopper().stop();
        assert_eq!(capture.tick(), TickOutcome::Submitted(0));
        capture.settle().unwrap();
        assert!(capture.is_complete());

        let mut capture = AutoCapture::new(stencils(2), Some(TestPattern), accept_all);
        capture.set_interval(Duration::from_millis(20));
        capture.stopper().stop();
        capture.poll();

        let handle = capture.spawn();
        thread::sleep(Duration::from_millis(500));
        let capture = handle.stop().unwrap();

        assert!(capture.is_complete());
    }

    /// After an acceptance moves the index the next capture waits a whole interval
    #[test]
    fn test_timer_restarts_on_stencil_change() {
        let interval = Duration::from_millis(150);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = calls.clone();

        let sink = move |_: &CapturedFrame, stencil: &Stencil| {
            let called = Instant::now();
            thread::sleep(Duration::from_millis(200));
            log.lock().unwrap().push((stencil.id.0, called, Instant::now()));
            Some(String::from("ok"))
        };

        let mut capture = AutoCapture::new(stencils(2), Some(TestPattern), sink);
        capture.set_interval(interval);

        let handle = capture.spawn();
        thread::sleep(Duration::from_millis(1500));
        let capture = handle.stop().unwrap();

        assert!(capture.is_complete());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);

        let (first, _, first_returned) = calls[0];
        let (second, second_called, _) = calls[1];
        assert_eq!((first, second), (1, 2));
        assert!(second_called.duration_since(first_returned) >= interval);
    }
}
