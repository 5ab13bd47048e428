//! # Acceptance Sink Module
//!
//! The acceptance sink decides whether a captured frame satisfies a stencil. It is supplied by
//! the user of the crate and runs on its own worker thread so that a slow decision never blocks
//! the capture timer.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::error::{Error, Result};
use crate::frame::CapturedFrame;
use crate::stencil::Stencil;

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// Decides whether a captured frame satisfies a stencil.
pub trait AcceptanceSink: Send + 'static {
    /// Inspect `frame` against `stencil`.
    ///
    /// Returns the processed image to keep for this stencil, or `None` to reject the frame. An
    /// empty string is treated as a rejection.
    fn process(&mut self, frame: &CapturedFrame, stencil: &Stencil) -> Option<String>;
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTS
// -----------------------------------------------------------------------------------------------

/// A frame sent to the sink for one stencil slot.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Slot the frame was captured for
    pub index: usize,

    /// The captured frame
    pub frame: CapturedFrame,

    /// The stencil the frame is checked against
    pub stencil: Stencil,
}

/// The sink's answer to a [`Submission`].
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Slot the submission was made for
    pub index: usize,

    /// The accepted image, `None` if the frame was rejected
    pub accepted: Option<String>,
}

/// Handle to the thread running the sink.
pub(crate) struct SinkWorker {
    jh: Option<JoinHandle<()>>,

    tx: Sender<WorkerCmd>,
}

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// Commands that can be sent to the sink worker thread.
enum WorkerCmd {
    /// Run the sink on a submission
    Submit(Submission),

    /// Stop the worker
    Stop
}

/// Events which wake the capture loop.
pub(crate) enum Event {
    /// The sink has finished with a submission
    Verdict(Verdict),

    /// The loop has been asked to stop
    Stop
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl<F> AcceptanceSink for F
where
    F: FnMut(&CapturedFrame, &Stencil) -> Option<String> + Send + 'static
{
    fn process(&mut self, frame: &CapturedFrame, stencil: &Stencil) -> Option<String> {
        self(frame, stencil)
    }
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.accepted.is_some()
    }
}

impl SinkWorker {
    /// Start the worker, which reports verdicts on `events`.
    pub(crate) fn spawn<K: AcceptanceSink>(sink: K, events: Sender<Event>) -> Self {
        let (tx, rx) = channel();

        Self {
            jh: Some(sink_thread(sink, rx, events)),
            tx,
        }
    }

    pub(crate) fn submit(&self, submission: Submission) -> Result<()> {
        self.tx.send(WorkerCmd::Submit(submission)).map_err(|_| Error::ChannelSendError)
    }

    /// Stop the worker, waiting for any submission being processed to finish.
    pub(crate) fn stop(&mut self) -> Result<()> {
        let jh = match self.jh.take() {
            Some(jh) => jh,
            None => return Ok(())
        };

        // The thread may already be gone, in which case joining is all that's left
        let _ = self.tx.send(WorkerCmd::Stop);

        jh.join().map_err(|_| Error::ThreadJoinError)
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop sink worker: {}", e);
        }
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Run the sink on submissions in a separate thread.
fn sink_thread<K: AcceptanceSink>(
    mut sink: K,
    cmd_rx: Receiver<WorkerCmd>,
    event_tx: Sender<Event>
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                WorkerCmd::Submit(submission) => {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        sink.process(&submission.frame, &submission.stencil)
                    }));

                    let accepted = match result {
                        Ok(accepted) => accepted.filter(|a| !a.is_empty()),
                        Err(_) => {
                            error!(
                                "Acceptance sink panicked on stencil {}, treating as rejected",
                                submission.stencil.id
                            );
                            None
                        }
                    };

                    debug!(
                        "Stencil {} {}",
                        submission.stencil.id,
                        if accepted.is_some() { "accepted" } else { "rejected" }
                    );

                    let verdict = Verdict { index: submission.index, accepted };
                    if event_tx.send(Event::Verdict(verdict)).is_err() {
                        break
                    }
                },
                WorkerCmd::Stop => {
                    break
                }
            }
        }
    })
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use image::{DynamicImage, RgbImage};

    fn submission(index: usize) -> Submission {
        Submission {
            index,
            frame: CapturedFrame::new(DynamicImage::ImageRgb8(RgbImage::new(2, 2))).unwrap(),
            stencil: Stencil::new(index as u32 + 1, "Test", "test.png"),
        }
    }

    fn next_verdict(rx: &Receiver<Event>) -> Verdict {
        match rx.recv().expect("Worker hung up") {
            Event::Verdict(v) => v,
            Event::Stop => panic!("Unexpected stop event")
        }
    }

    #[test]
    fn test_worker_reports_verdicts() {
        let (tx, rx) = channel();
        let mut worker = SinkWorker::spawn(
            |frame: &CapturedFrame, stencil: &Stencil| {
                if stencil.id.0 == 1 { Some(frame.data_url.clone()) } else { None }
            },
            tx
        );

        worker.submit(submission(0)).unwrap();
        worker.submit(submission(1)).unwrap();

        let first = next_verdict(&rx);
        assert_eq!(first.index, 0);
        assert!(first.is_accepted());

        let second = next_verdict(&rx);
        assert_eq!(second, Verdict { index: 1, accepted: None });

        worker.stop().unwrap();
        assert!(worker.submit(submission(2)).is_err());
    }

    /// An empty result counts as a rejection
    #[test]
    fn test_empty_result_rejected() {
        let (tx, rx) = channel();
        let worker = SinkWorker::spawn(|_: &CapturedFrame, _: &Stencil| Some(String::new()), tx);

        worker.submit(submission(0)).unwrap();

        assert!(!next_verdict(&rx).is_accepted());
    }

    /// A panicking sink rejects the frame but keeps the worker alive
    #[test]
    fn test_panicking_sink() {
        let (tx, rx) = channel();
        let mut calls = 0;
        let worker = SinkWorker::spawn(
            move |_: &CapturedFrame, _: &Stencil| {
                calls += 1;
                if calls == 1 {
                    panic!("sink failure");
                }
                Some(String::from("ok"))
            },
            tx
        );

        worker.submit(submission(0)).unwrap();
        assert!(!next_verdict(&rx).is_accepted());

        worker.submit(submission(0)).unwrap();
        assert_eq!(next_verdict(&rx).accepted.as_deref(), Some("ok"));
    }
}
