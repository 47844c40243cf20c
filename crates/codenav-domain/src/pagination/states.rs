//! Logical precise-index states and their backing-store equivalents.

use crate::error::{DomainError, DomainResult};

/// The backing record kind a state or row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Upload,
    Index,
}

/// Logical name → (source, backing state). Part of the public API surface;
/// saved cursors and filters depend on it.
const STATE_TABLE: &[(&str, Source, &str)] = &[
    ("UPLOADING_INDEX", Source::Upload, "uploading"),
    ("QUEUED_FOR_PROCESSING", Source::Upload, "queued"),
    ("PROCESSING", Source::Upload, "processing"),
    ("PROCESSING_ERRORED", Source::Upload, "errored"),
    ("COMPLETED", Source::Upload, "completed"),
    ("DELETING", Source::Upload, "deleting"),
    ("DELETED", Source::Upload, "deleted"),
    ("QUEUED_FOR_INDEXING", Source::Index, "queued"),
    ("INDEXING", Source::Index, "processing"),
    ("INDEXING_ERRORED", Source::Index, "errored"),
    ("INDEXING_COMPLETED", Source::Index, "completed"),
];

/// Maps a logical state name (case-insensitive) to its source and backing state.
pub fn backing_state(name: &str) -> Option<(Source, &'static str)> {
    STATE_TABLE
        .iter()
        .find(|(logical, _, _)| logical.eq_ignore_ascii_case(name))
        .map(|(_, source, backing)| (*source, *backing))
}

/// Maps a backing state of a given source back to its logical name.
pub fn logical_state(source: Source, backing: &str) -> Option<&'static str> {
    STATE_TABLE
        .iter()
        .find(|(_, s, b)| *s == source && *b == backing)
        .map(|(logical, _, _)| *logical)
}

/// A logical state filter split into per-source backing states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSplit {
    pub upload: Vec<String>,
    pub index: Vec<String>,
}

impl StateSplit {
    /// Splits logical state names by source. Duplicates are dropped and an
    /// unmapped name is an error.
    pub fn from_logical<S: AsRef<str>>(names: &[S]) -> DomainResult<Self> {
        let mut split = Self::default();
        for name in names {
            let name = name.as_ref();
            let (source, backing) =
                backing_state(name).ok_or_else(|| DomainError::UnknownState {
                    state: name.to_string(),
                })?;
            let states = match source {
                Source::Upload => &mut split.upload,
                Source::Index => &mut split.index,
            };
            if !states.iter().any(|s| s == backing) {
                states.push(backing.to_string());
            }
        }
        Ok(split)
    }

    /// The filter names only index states, so no upload can match.
    pub fn skip_uploads(&self) -> bool {
        self.upload.is_empty() && !self.index.is_empty()
    }

    /// The filter names only upload states, so no index can match.
    pub fn skip_indexes(&self) -> bool {
        self.index.is_empty() && !self.upload.is_empty()
    }
}
