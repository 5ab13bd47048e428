//! # Camera Module
//!
//! A V4L2 camera as a [`FrameSource`]. The stream is started when the camera is opened and
//! stopped when the source is released or dropped.
//! Under the hood this uses [`rscam`](https://github.com/loyd/rscam), therefore currently only
//! Linux is supported.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use log::{info, warn};
use rscam::{Camera, Frame};

use crate::error::{Error, Result};
use crate::frame::FrameSource;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Stream settings for a camera, mapping onto `rscam::Config`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Frame interval, V4L2 uses intervals rather than framerates, default `(1, 10)`
    pub interval: (u32, u32),

    /// Resolution, default `(640, 480)`
    pub resolution: (u32, u32),

    /// FourCC format of the images, default `MJPG`
    pub format: [u8; 4],

    /// Storage method for interlaced video, one of the `rscam::FIELD_x` values
    pub field: u32,

    /// Number of buffers in the queue, default 2
    pub nbuffers: u32,
}

/// A started V4L2 camera.
pub struct CameraSource {
    path: PathBuf,

    camera: Camera,

    img_format: ImageFormat,

    streaming: bool,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            interval: (1, 10),
            resolution: (640, 480),
            format: *b"MJPG",
            field: rscam::FIELD_NONE,
            nbuffers: 2,
        }
    }
}

impl CameraConfig {
    fn rscam_config(&self) -> rscam::Config<'_> {
        rscam::Config {
            interval: self.interval,
            resolution: self.resolution,
            format: &self.format,
            field: self.field,
            nbuffers: self.nbuffers,
        }
    }
}

impl CameraSource {
    /// Open the camera at `path` and start streaming.
    ///
    /// This function can fail if the device cannot be opened, if the underlying V4L2 stream
    /// cannot be started, or if the configured format cannot be decoded.
    pub fn open<P: AsRef<Path>>(path: P, config: &CameraConfig) -> Result<Self> {
        let path = path.as_ref();

        let img_format = format_from_fourcc(&config.format)
            .ok_or_else(|| Error::ImageFormatError(
                String::from_utf8_lossy(&config.format).into_owned()
            ))?;

        let mut camera = Camera::new(&path.to_string_lossy())
            .map_err(|e| Error::CamOpenError(path.to_path_buf(), e))?;

        camera.start(&config.rscam_config()).map_err(Error::CamStartError)?;

        info!(
            "Camera {:?} started at {}x{}",
            path, config.resolution.0, config.resolution.1
        );

        Ok(Self {
            path: path.to_path_buf(),
            camera,
            img_format,
            streaming: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the stream, after which no more frames are produced.
    pub fn release(&mut self) {
        if !self.streaming {
            return;
        }
        self.streaming = false;

        match self.camera.stop() {
            Ok(()) => info!("Camera {:?} released", self.path),
            Err(e) => warn!("Failed to stop camera {:?}: {}", self.path, e)
        }
    }
}

impl FrameSource for CameraSource {
    fn grab(&mut self) -> Result<Option<DynamicImage>> {
        if !self.streaming {
            return Ok(None);
        }

        let frame = self.camera.capture()
            .map_err(Error::CameraCaptureError)?;

        Ok(Some(rscam_frame_to_dynamic_image(frame, self.img_format)?))
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Convert an `rscam::Frame` struct into an `image::DynamicImage` struct.
fn rscam_frame_to_dynamic_image(frame: Frame, format: ImageFormat) -> Result<DynamicImage> {
    image::load_from_memory_with_format(&frame, format)
        .map_err(Error::ImageConversionError)
}

fn format_from_fourcc(format: &[u8]) -> Option<ImageFormat> {
    match format {
        b"MJPG" => Some(ImageFormat::Jpeg),
        _ => None
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_unsupported_format() {
        let config = CameraConfig {
            format: *b"YUYV",
            ..CameraConfig::default()
        };

        match CameraSource::open("/dev/video0", &config) {
            Err(Error::ImageFormatError(f)) => assert_eq!(f, "YUYV"),
            Err(e) => panic!("Expected ImageFormatError, got {}", e),
            Ok(_) => panic!("Expected ImageFormatError")
        }
    }

    #[test]
    fn test_missing_device() {
        match CameraSource::open("/dev/no_such_video", &CameraConfig::default()) {
            Err(Error::CamOpenError(p, _)) => assert_eq!(p, Path::new("/dev/no_such_video")),
            Err(e) => panic!("Expected CamOpenError, got {}", e),
            Ok(_) => panic!("Expected CamOpenError")
        }
    }

    /// Needs a camera at /dev/video0
    #[test]
    #[ignore]
    fn test_capture_and_release() {
        let mut cam = CameraSource::open("/dev/video0", &CameraConfig::default())
            .expect("Cannot open /dev/video0");

        let img = cam.grab().expect("Failed to get camera image").expect("Expected a frame");
        assert_eq!((img.width(), img.height()), (640, 480));

        cam.release();
        assert!(cam.grab().unwrap().is_none());
    }
}
