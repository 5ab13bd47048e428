//! # Stencil Module
//!
//! Stencils are the overlay guide images the user lines up with before a frame is captured. The
//! set of stencils is fixed once the capture controller is built.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::ops::Index;
use std::path::{Path, PathBuf};

use derive_more::Display;
use image::DynamicImage;
use serde::Deserialize;

use crate::error::{Error, Result};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Number of stencils in the reference layout.
pub const REFERENCE_STENCIL_COUNT: u32 = 8;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Identifier of a stencil.
#[derive(Deserialize, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct StencilId(pub u32);

/// A named overlay guide image.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Stencil {
    /// Identifier of the stencil
    pub id: StencilId,

    /// Human readable name, e.g. `Stencil 1`
    pub name: String,

    /// Path to the overlay image
    pub overlay: PathBuf,
}

/// An ordered, non-empty and immutable list of stencils.
#[derive(Debug, Clone, PartialEq)]
pub struct StencilSet {
    stencils: Vec<Stencil>,
}

/// On-disk layout of a stencil set file.
#[derive(Deserialize)]
struct StencilFile {
    stencils: Vec<Stencil>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Stencil {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(id: u32, name: S, overlay: P) -> Self {
        Self {
            id: StencilId(id),
            name: name.into(),
            overlay: overlay.into(),
        }
    }

    /// Load the overlay image of this stencil.
    pub fn load_overlay(&self) -> Result<DynamicImage> {
        image::open(&self.overlay)
            .map_err(|e| Error::OverlayLoadError(self.id, self.overlay.clone(), e))
    }
}

impl StencilSet {
    /// Create a new set from the given stencils, which must not be empty.
    pub fn new(stencils: Vec<Stencil>) -> Result<Self> {
        if stencils.is_empty() {
            return Err(Error::EmptyStencilSet);
        }

        Ok(Self { stencils })
    }

    /// The reference layout: eight stencils named `Stencil 1` to `Stencil 8` whose overlays are
    /// `stencil1.png` to `stencil8.png` inside `dir`.
    pub fn reference<P: AsRef<Path>>(dir: P) -> Self {
        let stencils = (1..=REFERENCE_STENCIL_COUNT)
            .map(|i| Stencil::new(
                i,
                format!("Stencil {}", i),
                dir.as_ref().join(format!("stencil{}.png", i))
            ))
            .collect();

        Self { stencils }
    }

    /// Load a stencil set from a file.
    ///
    /// The file type will be guessed at runtime, any file type supported by
    /// [`serde_any`](https://docs.rs/serde_any/0.5.0/serde_any/) is supported. The file must
    /// contain a `stencils` list whose entries have `id`, `name` and `overlay` fields. Relative
    /// overlay paths are resolved against the directory containing the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let file: StencilFile = serde_any::from_file(path)
            .map_err(Error::DeserialisationError)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let stencils = file.stencils
            .into_iter()
            .map(|mut s| {
                if s.overlay.is_relative() {
                    s.overlay = base.join(&s.overlay);
                }
                s
            })
            .collect();

        Self::new(stencils)
    }

    /// Number of stencils in the set, always at least one.
    pub fn len(&self) -> usize {
        self.stencils.len()
    }

    pub fn get(&self, index: usize) -> Option<&Stencil> {
        self.stencils.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stencil> {
        self.stencils.iter()
    }
}

impl Index<usize> for StencilSet {
    type Output = Stencil;

    fn index(&self, index: usize) -> &Stencil {
        &self.stencils[index]
    }
}

impl<'a> IntoIterator for &'a StencilSet {
    type Item = &'a Stencil;
    type IntoIter = std::slice::Iter<'a, Stencil>;

    fn into_iter(self) -> Self::IntoIter {
        self.stencils.iter()
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
