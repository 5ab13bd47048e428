//! # Stencil guided camera capture
//!
//! This crate captures camera images against a series of overlay guide images ("stencils").
//! Every few seconds a frame is grabbed for the current stencil and handed to a user supplied
//! acceptance sink, which either accepts it (returning the processed image to keep) or rejects
//! it. Rejected stencils are retried on the next tick, accepted ones are stored and the capture
//! moves on to the next stencil still missing an image, until every stencil has one.
//!
//! Cameras are accessed through [`rscam`](https://github.com/loyd/rscam) over V4L2, therefore
//! currently only Linux is supported. Other video sources can be plugged in by implementing
//! [`FrameSource`].
//!
//! ## Dependencies
//!
//! Before installing make sure that the following dependencies are installed:
//!
//! - V4L2 - video for linux 2, including the dev headers
//!
//! ### Ubuntu
//!
//! ```shell
//! sudo apt install v4l-utils libv4l-dev
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use cv_stencilcap::prelude::*;
//!
//! let capture = AutoCaptureBuilder::new()
//!     // Eight stencils, overlays at stencils/stencil1.png to stencils/stencil8.png
//!     .stencils(StencilSet::reference("stencils"))
//!     // The device to capture from. If it is missing or cannot be opened the controller is
//!     // still built, it just never captures anything
//!     .path("/dev/video0")
//!     .resolution((640, 480))
//!     .format(b"MJPG")
//!     .expect("Invalid FourCC")
//!     // The sink decides whether a frame matches the stencil
//!     .build(|frame: &CapturedFrame, _stencil: &Stencil| Some(frame.data_url.clone()))
//!     .expect("Failed to build the capture controller");
//!
//! // Tick every 4 seconds on a background thread
//! let handle = capture.spawn();
//! std::thread::sleep(Duration::from_secs(60));
//!
//! let capture = handle.stop().expect("Failed to stop the capture loop");
//! println!("{}", capture.view());
//! ```

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use builder::AutoCaptureBuilder;
pub use camera::{CameraConfig, CameraSource};
pub use controller::{AutoCapture, CaptureHandle, Stopper, TickOutcome, DEFAULT_TICK_INTERVAL};
pub use error::{Error, Result};
pub use frame::{
    capture_frame, compose_overlay, encode_data_url, CapturedFrame, FrameSource
};
pub use sink::{AcceptanceSink, Submission, Verdict};
pub use slots::{next_empty, CaptureSlots};
pub use stencil::{Stencil, StencilId, StencilSet};
pub use view::{CaptureView, SlotView};

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

mod builder;
mod camera;
mod controller;
mod error;
mod frame;
mod sink;
mod slots;
mod stencil;
mod view;

pub mod prelude {
    pub use crate::{AutoCapture, AutoCaptureBuilder, TickOutcome};
    pub use crate::{AcceptanceSink, CapturedFrame, FrameSource};
    pub use crate::{Stencil, StencilSet};
}
