//! Nearest-neighbor identity matching over the enrollment gallery.

use crate::gallery::Gallery;
use crate::types::{Embedding, EmbeddingError};

/// Maximum Euclidean distance for a positive identity match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Strategy for resolving a probe embedding to an enrolled identity.
pub trait Matcher {
    /// Resolve a probe to a display name, or `None` if no reference is close
    /// enough (the person is unknown). A malformed probe is an error for
    /// this detection only; the caller skips it and continues.
    fn resolve<'g>(
        &self,
        probe: &Embedding,
        gallery: &'g Gallery,
    ) -> Result<Option<&'g str>, EmbeddingError>;
}

/// Global-minimum Euclidean distance matcher.
///
/// Scans every reference embedding and keeps the strict minimum, so on a
/// tie the first entry in gallery order wins.
pub struct NearestMatcher {
    threshold: f32,
}

impl NearestMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for NearestMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl Matcher for NearestMatcher {
    fn resolve<'g>(
        &self,
        probe: &Embedding,
        gallery: &'g Gallery,
    ) -> Result<Option<&'g str>, EmbeddingError> {
        let mut best: Option<(&str, f32)> = None;

        for entry in gallery.entries() {
            let dist = probe.euclidean_distance(&entry.embedding)?;
            let closer = match best {
                None => true,
                Some((_, best_dist)) => dist < best_dist,
            };
            if closer {
                best = Some((entry.person.as_str(), dist));
            }
        }

        Ok(best
            .filter(|&(_, dist)| dist < self.threshold)
            .map(|(person, _)| person))
    }
}
