//! Shell offset generation.

use std::{ops::Deref, sync::Arc};

use crate::error::FurError;

/// Ordered shell offset fractions, `i / N` for `i` in `1..=N`.
///
/// Cheap to clone; every mesh built from the same material shares one
/// allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellOffsets(Arc<[f32]>);

impl ShellOffsets {
    /// Number of shells.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.len() as u32
    }

    /// Offsets as a plain slice (one scalar per instance).
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl Deref for ShellOffsets {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// Generate `count` offsets `1/count, 2/count, ..., 1`.
///
/// # Errors
///
/// Returns [`FurError::InvalidShellCount`] when `count` is zero.
pub fn generate_offsets(count: u32) -> Result<ShellOffsets, FurError> {
    if count == 0 {
        return Err(FurError::InvalidShellCount(count));
    }
    let n = count as f32;
    let offsets: Arc<[f32]> = (1..=count).map(|i| i as f32 / n).collect();
    Ok(ShellOffsets(offsets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_shells_is_rejected() {
        assert!(matches!(
            generate_offsets(0),
            Err(FurError::InvalidShellCount(0))
        ));
    }

    #[test]
    fn offsets_are_strictly_increasing_and_end_at_one() {
        for n in [1, 2, 3, 7, 16, 64, 255] {
            let offsets = generate_offsets(n).unwrap();
            assert_eq!(offsets.count(), n);
            assert_eq!(offsets[0], 1.0 / n as f32);
            assert_eq!(*offsets.last().unwrap(), 1.0);
            assert!(offsets.windows(2).all(|w| w[0] < w[1]));
            assert!(offsets.iter().all(|&o| o > 0.0 && o <= 1.0));
        }
    }

    #[test]
    fn clones_share_storage() {
        let a = generate_offsets(16).unwrap();
        let b = a.clone();
        assert!(std::ptr::eq(a.as_slice(), b.as_slice()));
    }
}
