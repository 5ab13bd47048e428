//! # `AutoCaptureBuilder` implementation
//!
//! This module implements the builder for capture controllers backed by a V4L2 camera.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::convert::TryInto;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::error;

use crate::camera::{CameraConfig, CameraSource};
use crate::controller::{AutoCapture, DEFAULT_TICK_INTERVAL};
use crate::error::{Error, Result};
use crate::sink::AcceptanceSink;
use crate::stencil::StencilSet;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Builds an [`AutoCapture`] which captures from a V4L2 camera.
pub struct AutoCaptureBuilder {
    stencils: Option<StencilSet>,

    path: Option<PathBuf>,

    config: CameraConfig,

    tick_interval: Duration,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for AutoCaptureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoCaptureBuilder {
    pub fn new() -> Self {
        Self {
            stencils: None,
            path: None,
            config: CameraConfig::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Set the stencils to capture against.
    pub fn stencils(mut self, stencils: StencilSet) -> Self {
        self.stencils = Some(stencils);

        self
    }

    /// Load the stencils from a file, see [`StencilSet::from_file`].
    pub fn stencils_from_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        Ok(self.stencils(StencilSet::from_file(path)?))
    }

    /// Device node the controller captures from, e.g. `/dev/video0`.
    ///
    /// The device is only opened by [`build`](Self::build). A node that is missing or cannot be
    /// opened then leaves the controller without a video source rather than failing.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());

        self
    }

    /// Set the period between capture ticks.
    ///
    /// Default value is 4 seconds.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;

        self
    }

    /// V4L2 frame interval the camera streams at while the controller waits for its next tick,
    /// `(1, 10)` unless set.
    pub fn interval(mut self, interval: (u32, u32)) -> Self {
        self.config.interval = interval;

        self
    }

    /// Capture resolution, which is also the size of the frames handed to the sink. `(640, 480)`
    /// unless set.
    pub fn resolution(mut self, resolution: (u32, u32)) -> Self {
        self.config.resolution = resolution;

        self
    }

    /// FourCC of the camera's output, `b"MJPG"` unless set.
    ///
    /// Only MJPG frames can be decoded, other codes fail when the camera is opened.
    pub fn format(mut self, format: &[u8]) -> Result<Self> {
        self.config.format = format.try_into()
            .map_err(|_| Error::BuildError(format!(
                "FourCC must be 4 bytes, got {:?}", String::from_utf8_lossy(format)
            )))?;

        Ok(self)
    }

    /// Interlacing mode as one of the `rscam::FIELD_x` values, `FIELD_NONE` unless set.
    pub fn field(mut self, field: u32) -> Self {
        self.config.field = field;

        self
    }

    /// Buffers the driver keeps queued between captures, 2 unless set. Frames are only grabbed
    /// once per tick so more buffers just hold older frames.
    pub fn num_buffers(mut self, num_buffers: u32) -> Self {
        self.config.nbuffers = num_buffers;

        self
    }

    /// Build the capture controller, with `sink` deciding which frames are accepted.
    ///
    /// Fails if the stencils or the device path were never given. If the camera itself cannot be
    /// opened the failure is logged and the controller is built without a video source, so it
    /// never captures anything.
    pub fn build<K: AcceptanceSink>(self, sink: K) -> Result<AutoCapture<CameraSource>> {
        let stencils = self.stencils
            .ok_or_else(|| Error::BuildError(String::from("Missing stencils")))?;

        let path = self.path
            .ok_or_else(|| Error::BuildError(String::from("Missing camera path")))?;

        let source = match CameraSource::open(&path, &self.config) {
            Ok(s) => Some(s),
            Err(e) => {
                error!("Error accessing camera: {}", e);
                None
            }
        };

        let mut capture = AutoCapture::new(stencils, source, sink);
        capture.set_interval(self.tick_interval);

        Ok(capture)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
