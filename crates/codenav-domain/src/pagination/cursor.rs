//! Pagination cursors.
//!
//! Single-source connections use [`OffsetCursor`]: the decimal offset of the
//! next row. The dual-source feed uses [`DualCursor`], with wire format
//! `"<uploadOffset>:<indexOffset>"`. An empty half means that source is
//! exhausted, and the empty string means both are. Clients hold these strings
//! across deploys, so the formats must not change.

use crate::error::{DomainError, DomainResult};

const DELIMITER: char = ':';

/// Read offset of a single-source connection. `None` means no further pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetCursor {
    pub offset: Option<usize>,
}

impl Default for OffsetCursor {
    fn default() -> Self {
        Self::start()
    }
}

impl OffsetCursor {
    pub fn start() -> Self {
        Self { offset: Some(0) }
    }

    pub fn exhausted() -> Self {
        Self { offset: None }
    }

    pub fn is_exhausted(&self) -> bool {
        self.offset.is_none()
    }

    /// Cursor following a page of `consumed` rows read at `offset` out of `total`.
    pub fn after(offset: usize, consumed: usize, total: usize) -> Self {
        let next = offset + consumed;
        Self {
            offset: (next < total).then_some(next),
        }
    }

    /// Encodes the cursor. An exhausted cursor encodes as `""`.
    pub fn encode(&self) -> String {
        self.offset.map(|o| o.to_string()).unwrap_or_default()
    }

    /// Decodes a cursor string: `""` or a non-negative decimal integer.
    pub fn decode(cursor: &str) -> DomainResult<Self> {
        Ok(Self {
            offset: parse_offset(cursor, cursor)?,
        })
    }
}

/// Per-source read offsets. `None` marks an exhausted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualCursor {
    pub upload_offset: Option<usize>,
    pub index_offset: Option<usize>,
}

impl Default for DualCursor {
    fn default() -> Self {
        Self::start()
    }
}

impl DualCursor {
    /// Cursor for the first page: both sources at offset zero.
    pub fn start() -> Self {
        Self {
            upload_offset: Some(0),
            index_offset: Some(0),
        }
    }

    /// Cursor with both sources exhausted.
    pub fn exhausted() -> Self {
        Self {
            upload_offset: None,
            index_offset: None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.upload_offset.is_none() && self.index_offset.is_none()
    }

    /// Encodes the cursor. Both halves exhausted encodes as `""`.
    pub fn encode(&self) -> String {
        if self.is_exhausted() {
            return String::new();
        }
        let half = |offset: Option<usize>| offset.map(|o| o.to_string()).unwrap_or_default();
        format!(
            "{}{}{}",
            half(self.upload_offset),
            DELIMITER,
            half(self.index_offset)
        )
    }

    /// Decodes a cursor string.
    ///
    /// Anything other than two colon-separated halves, each empty or a
    /// non-negative decimal integer, and not both empty, is rejected.
    pub fn decode(cursor: &str) -> DomainResult<Self> {
        if cursor.is_empty() {
            return Ok(Self::exhausted());
        }

        let parts: Vec<&str> = cursor.split(DELIMITER).collect();
        if parts.len() != 2 {
            return Err(DomainError::InvalidCursor {
                cursor: cursor.to_string(),
                message: format!("expected 2 parts, got {}", parts.len()),
            });
        }

        let decoded = Self {
            upload_offset: parse_offset(cursor, parts[0])?,
            index_offset: parse_offset(cursor, parts[1])?,
        };
        // Both sources exhausted is spelled "", never ":".
        if decoded.is_exhausted() {
            return Err(DomainError::InvalidCursor {
                cursor: cursor.to_string(),
                message: "both offsets empty".to_string(),
            });
        }
        Ok(decoded)
    }
}

/// Parses one offset of `cursor`. Empty means exhausted; anything else must be
/// ASCII digits without a leading zero, so every accepted cursor re-encodes
/// to itself.
fn parse_offset(cursor: &str, half: &str) -> DomainResult<Option<usize>> {
    if half.is_empty() {
        return Ok(None);
    }
    if !half.bytes().all(|b| b.is_ascii_digit()) || (half.len() > 1 && half.starts_with('0')) {
        return Err(DomainError::InvalidCursor {
            cursor: cursor.to_string(),
            message: format!("invalid offset {half:?}: expected canonical decimal digits"),
        });
    }
    half.parse::<usize>()
        .map(Some)
        .map_err(|e| DomainError::InvalidCursor {
            cursor: cursor.to_string(),
            message: format!("invalid offset {half:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_cursor_encoding() {
        assert_eq!(OffsetCursor::start().encode(), "0");
        assert_eq!(OffsetCursor::exhausted().encode(), "");
        assert_eq!(OffsetCursor::decode("").unwrap(), OffsetCursor::exhausted());
        assert_eq!(OffsetCursor::decode("25").unwrap().offset, Some(25));
    }

    #[test]
    fn test_offset_cursor_after_page() {
        assert_eq!(OffsetCursor::after(0, 10, 25).offset, Some(10));
        assert_eq!(OffsetCursor::after(20, 5, 25), OffsetCursor::exhausted());
    }

    #[test]
    fn test_non_canonical_offsets_are_rejected() {
        for cursor in ["+3", "-1", " 3", "3 ", "0x10", "007", "3:4", "٣"] {
            let err = OffsetCursor::decode(cursor).unwrap_err();
            assert!(matches!(err, DomainError::InvalidCursor { .. }), "{cursor}");
        }
        for cursor in ["+3:4", "3:+4", " 3:4", "3:4 ", "03:4", ":"] {
            let err = DualCursor::decode(cursor).unwrap_err();
            assert!(matches!(err, DomainError::InvalidCursor { .. }), "{cursor}");
        }
    }
}
