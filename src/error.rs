//! # `cv_stencilcap` Error module
//!
//! Provides abstractions over errors which can occur during this crate's use.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;

use rscam;
use serde_any;
use thiserror;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// Result type used by faillible functions inside the `cv_stencilcap` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors which can occur during use of the `cv_stencilcap` crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot find file at {0:?}")]
    FileNotFound(PathBuf),

    #[error("Error deserialising data: {0}")]
    DeserialisationError(serde_any::Error),

    #[error("A stencil set must contain at least one stencil")]
    EmptyStencilSet,

    #[error("Unsupported image format {0:?}, only MJPG can be decoded")]
    ImageFormatError(String),

    #[error("Cannot build the capture controller: {0}")]
    BuildError(String),

    #[error("Cannot open camera at {0:?}: {1}")]
    CamOpenError(PathBuf, std::io::Error),

    #[error("Cannot start camera stream: {0}")]
    CamStartError(rscam::Error),

    #[error("Error capturing camera image: {0}")]
    CameraCaptureError(std::io::Error),

    #[error("Error occured while converting an image: {0}")]
    ImageConversionError(image::ImageError),

    #[error("Cannot load overlay for stencil {0} from {1:?}: {2}")]
    OverlayLoadError(crate::StencilId, PathBuf, image::ImageError),

    #[error("Cannot send command to the sink worker thread")]
    ChannelSendError,

    #[error("The sink worker thread hung up unexpectedly")]
    ChannelReceiveError,

    #[error("Failed to join a worker thread")]
    ThreadJoinError,
}
