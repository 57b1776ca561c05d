//! Enrollment gallery — identity → reference embeddings, loaded once at startup.
//!
//! The gallery file is written by the enrollment flow and is read-only here.
//! Format: JSON map of enrollment id → `{ name, encodings: [[f32; D], ...] }`.

use crate::types::Embedding;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery file not found: {0} — run enrollment first")]
    NotFound(String),
    #[error("failed to read gallery file: {0}")]
    Io(#[from] std::io::Error),
    #[error("gallery file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error(
        "inconsistent embedding dimensions in gallery: {person} has {actual}, expected {expected}"
    )]
    DimensionMismatch {
        person: String,
        expected: usize,
        actual: usize,
    },
}

/// One enrolled person as stored in the gallery file.
#[derive(Debug, Clone, Deserialize)]
pub struct Enrollment {
    pub name: String,
    pub encodings: Vec<Vec<f32>>,
}

/// One reference embedding, flattened out of an enrollment.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    /// Display name of the owning person.
    pub person: String,
    pub embedding: Embedding,
}

/// Immutable set of reference embeddings for all enrolled people.
///
/// Entries are flattened in enrollment-id order, so matcher tie-breaking
/// ("first minimum wins") is deterministic across runs.
#[derive(Debug)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
    dim: Option<usize>,
}

impl Gallery {
    /// Load the gallery from a JSON file. A corrupt file is fatal: there is
    /// no partial load.
    pub fn load(path: &Path) -> Result<Self, GalleryError> {
        if !path.exists() {
            return Err(GalleryError::NotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        // BTreeMap keeps enrollment ids sorted.
        let enrollments: BTreeMap<String, Enrollment> = serde_json::from_str(&raw)?;
        let gallery = Self::from_enrollments(enrollments)?;
        tracing::info!(
            path = %path.display(),
            people = gallery.people().count(),
            references = gallery.len(),
            "gallery loaded"
        );
        Ok(gallery)
    }

    /// Build a gallery from already-parsed enrollments, keyed by enrollment id.
    pub fn from_enrollments(
        enrollments: BTreeMap<String, Enrollment>,
    ) -> Result<Self, GalleryError> {
        let mut entries = Vec::new();
        let mut dim: Option<usize> = None;

        for Enrollment { name, encodings } in enrollments.into_values() {
            for values in encodings {
                match dim {
                    None => dim = Some(values.len()),
                    Some(expected) if expected != values.len() => {
                        return Err(GalleryError::DimensionMismatch {
                            person: name.clone(),
                            expected,
                            actual: values.len(),
                        });
                    }
                    Some(_) => {}
                }
                entries.push(GalleryEntry {
                    person: name.clone(),
                    embedding: Embedding::new(values),
                });
            }
        }

        Ok(Self { entries, dim })
    }

    /// Flattened reference embeddings, in stable enrollment-id order.
    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Embedding dimensionality, if any reference exists.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unique display names, in first-seen (enrollment-id) order.
    pub fn people(&self) -> impl Iterator<Item = &str> + '_ {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter_map(move |e| seen.insert(e.person.as_str()).then_some(e.person.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_gallery(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_flattens_in_id_order() {
        let file = write_gallery(
            r#"{
                "emp-002": { "name": "Bea", "encodings": [[0.5, 0.5]] },
                "emp-001": { "name": "Ada", "encodings": [[1.0, 0.0], [0.9, 0.1]] }
            }"#,
        );
        let gallery = Gallery::load(file.path()).unwrap();
        assert_eq!(gallery.len(), 3);
        // emp-001 sorts before emp-002 regardless of file order
        assert_eq!(gallery.entries()[0].person, "Ada");
        assert_eq!(gallery.entries()[1].person, "Ada");
        assert_eq!(gallery.entries()[2].person, "Bea");
        assert_eq!(gallery.dim(), Some(2));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Gallery::load(Path::new("/nonexistent/gallery.json")).unwrap_err();
        assert!(matches!(err, GalleryError::NotFound(_)));
    }

    #[test]
    fn test_load_corrupt_file_is_fatal() {
        let file = write_gallery("{ not json at all");
        assert!(matches!(
            Gallery::load(file.path()),
            Err(GalleryError::Corrupt(_))
        ));
    }

    #[test]
    fn test_inconsistent_dimensions_rejected() {
        let file = write_gallery(
            r#"{
                "emp-001": { "name": "Ada", "encodings": [[1.0, 0.0]] },
                "emp-002": { "name": "Bea", "encodings": [[0.5, 0.5, 0.5]] }
            }"#,
        );
        assert!(matches!(
            Gallery::load(file.path()),
            Err(GalleryError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_gallery_allowed() {
        let file = write_gallery("{}");
        let gallery = Gallery::load(file.path()).unwrap();
        assert!(gallery.is_empty());
        assert_eq!(gallery.dim(), None);
    }

    #[test]
    fn test_people_deduplicates() {
        let file = write_gallery(
            r#"{
                "emp-001": { "name": "Ada", "encodings": [[1.0], [0.9]] },
                "emp-002": { "name": "Bea", "encodings": [[0.5]] }
            }"#,
        );
        let gallery = Gallery::load(file.path()).unwrap();
        let people: Vec<&str> = gallery.people().collect();
        assert_eq!(people, vec!["Ada", "Bea"]);
    }
}
