//! # View Module
//!
//! A snapshot of what the capture surface shows: the overlay for the current stencil and a
//! gallery with one entry per stencil.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fmt;

use crate::stencil::Stencil;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// The state of the capture surface.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureView<'a> {
    /// The stencil whose overlay is drawn over the live video
    pub overlay: &'a Stencil,

    /// Index of `overlay` in the stencil set
    pub current: usize,

    /// The gallery, in stencil order
    pub slots: Vec<SlotView<'a>>,
}

/// One gallery entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView<'a> {
    pub stencil: &'a Stencil,

    /// The accepted image, `None` while waiting
    pub image: Option<&'a str>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl<'a> SlotView<'a> {
    pub fn is_placeholder(&self) -> bool {
        self.image.is_none()
    }
}

impl<'a> CaptureView<'a> {
    /// Number of gallery entries still showing a placeholder.
    pub fn waiting(&self) -> usize {
        self.slots.iter().filter(|s| s.is_placeholder()).count()
    }
}

impl<'a> fmt::Display for SlotView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.image {
            Some(_) => write!(f, "[{}] {}: captured", self.stencil.id, self.stencil.name),
            None => write!(f, "[{}] {}: Waiting...", self.stencil.id, self.stencil.name)
        }
    }
}

impl<'a> fmt::Display for CaptureView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stencil overlay: {}", self.overlay.name)?;
        writeln!(f, "Captured images:")?;

        for slot in &self.slots {
            writeln!(f, "  {}", slot)?;
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
