//! # Capture Slots Module
//!
//! One slot per stencil, each either empty or holding the accepted image for that stencil. Slots
//! only ever go from empty to filled.

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// The per-stencil accepted images.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSlots {
    slots: Vec<Option<String>>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl CaptureSlots {
    /// Create `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self { slots: vec![None; len] }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_filled(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// The accepted image at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|s| s.as_deref())
    }

    /// True once every slot holds an accepted image.
    pub fn all_filled(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Fill the slot at `index`.
    ///
    /// Returns false and leaves the slot untouched if it is already filled or out of range.
    pub(crate) fn fill(&mut self, index: usize, image: String) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(image);
                true
            },
            _ => false
        }
    }

    /// Index of the next empty slot after `from`, see [`next_empty`].
    pub fn next_empty(&self, from: usize) -> usize {
        next_empty(&self.slots, from)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.slots.iter().map(|s| s.as_deref())
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Scan forward from `from`, wrapping around, for the first empty slot.
///
/// The scan starts at the slot after `from` and stops when it gets back to `from`, so `from` is
/// returned unchanged when no other slot is empty.
pub fn next_empty<T>(slots: &[Option<T>], from: usize) -> usize {
    let len = slots.len();
    if len == 0 {
        return from;
    }

    let mut next = (from + 1) % len;
    while slots[next].is_some() && next != from {
        next = (next + 1) % len;
    }

    next
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_next_empty_skips_filled() {
        let slots = [None, Some(1), Some(2), None];

        assert_eq!(next_empty(&slots, 0), 3);
        assert_eq!(next_empty(&slots, 3), 0);
    }

    #[test]
    fn test_next_empty_wraps() {
        let slots = [None, None, Some(1)];

        assert_eq!(next_empty(&slots, 1), 0);
    }

    /// With every slot filled the scan comes back around to where it started
    #[test]
    fn test_next_empty_all_filled() {
        let slots = [Some(0), Some(1), Some(2)];

        for i in 0..3 {
            assert_eq!(next_empty(&slots, i), i);
        }
    }

    /// The starting slot is only returned once nothing else is empty, even if it is empty itself
    #[test]
    fn test_next_empty_only_start_empty() {
        let slots = [Some(0), None, Some(2)];

        assert_eq!(next_empty(&slots, 1), 1);
    }

    #[test]
    fn test_next_empty_single() {
        assert_eq!(next_empty(&[None::<u8>], 0), 0);
        assert_eq!(next_empty(&[Some(1)], 0), 0);
    }

    #[test]
    fn test_fill_is_monotonic() {
        let mut slots = CaptureSlots::new(2);

        assert!(slots.fill(1, String::from("a")));
        assert!(!slots.fill(1, String::from("b")));
        assert!(!slots.fill(2, String::from("c")));

        assert_eq!(slots.get(1), Some("a"));
        assert_eq!(slots.get(0), None);
        assert_eq!(slots.filled_count(), 1);
        assert!(!slots.all_filled());

        slots.fill(0, String::from("d"));
        assert!(slots.all_filled());
    }
}
