//! # Frame Module
//!
//! Grabbing still frames from a live source and turning them into something that can be handed
//! to an acceptance sink or shown to the user.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, ImageOutputFormat};

use crate::error::{Error, Result};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Prefix of the data URLs produced by [`encode_data_url`].
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// A live video source.
pub trait FrameSource {
    /// Grab the latest frame at the source's native resolution.
    ///
    /// Returns `Ok(None)` if no frame is currently available, for instance when the stream has
    /// not been attached yet.
    fn grab(&mut self) -> Result<Option<DynamicImage>>;
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A still frame captured from a [`FrameSource`].
#[derive(Clone)]
pub struct CapturedFrame {
    /// The decoded frame
    pub image: DynamicImage,

    /// The frame encoded as a PNG data URL
    pub data_url: String,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl CapturedFrame {
    /// Encode `image` and wrap it up as a captured frame.
    pub fn new(image: DynamicImage) -> Result<Self> {
        let data_url = encode_data_url(&image)?;

        Ok(Self { image, data_url })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl std::fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("data_url_len", &self.data_url.len())
            .finish()
    }
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn grab(&mut self) -> Result<Option<DynamicImage>> {
        (**self).grab()
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Capture a still frame from the source.
///
/// Returns `Ok(None)` if the source has no frame available.
pub fn capture_frame<S: FrameSource + ?Sized>(source: &mut S) -> Result<Option<CapturedFrame>> {
    match source.grab()? {
        Some(image) => Ok(Some(CapturedFrame::new(image)?)),
        None => Ok(None)
    }
}

/// Encode an image as a `data:image/png;base64,...` URL.
pub fn encode_data_url(image: &DynamicImage) -> Result<String> {
    let mut png = Vec::new();
    image.write_to(&mut png, ImageOutputFormat::Png)
        .map_err(Error::ImageConversionError)?;

    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(&png)))
}

/// Draw `overlay` on top of `frame`, stretching it to cover the whole frame.
///
/// The overlay's alpha channel is respected, so transparent regions leave the frame visible.
pub fn compose_overlay(frame: &DynamicImage, overlay: &DynamicImage) -> DynamicImage {
    let (width, height) = frame.dimensions();

    let top = if overlay.dimensions() == (width, height) {
        DynamicImage::ImageRgba8(overlay.to_rgba8())
    } else {
        DynamicImage::ImageRgba8(
            overlay.resize_exact(width, height, FilterType::Triangle).to_rgba8()
        )
    };

    let mut out = DynamicImage::ImageRgba8(frame.to_rgba8());
    imageops::overlay(&mut out, &top, 0, 0);

    out
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
