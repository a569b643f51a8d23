//! Presentation-only board layout and its postcard codec.
//!
//! The backend stores no ordering, so column order and card order only
//! live on the client. A [`BoardLayout`] captures them so a client can
//! restore manual ordering after a rebuild.

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Current layout encoding version.
pub const LAYOUT_VERSION: u8 = 1;

/// Error type for layout encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The encoded layout was written by an unsupported version.
    #[error("unsupported layout version {found} (expected {LAYOUT_VERSION})")]
    UnsupportedVersion {
        /// Version byte found in the input.
        found: u8,
    },
}

/// One column of a saved layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Column label.
    pub label: String,
    /// Card ids in display order.
    pub items: Vec<TaskId>,
}

/// Saved column and card order for one grouping key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    /// Grouping key the layout was captured under (`category`, `priority`, `status`).
    pub grouping: String,
    /// Columns in display order.
    pub columns: Vec<ColumnLayout>,
}

#[derive(Serialize, Deserialize)]
struct VersionedLayout {
    version: u8,
    layout: BoardLayout,
}

/// Encodes a [`BoardLayout`] with a leading version byte.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the layout cannot be serialized.
pub fn encode(layout: &BoardLayout) -> Result<Vec<u8>, CodecError> {
    let versioned = VersionedLayout {
        version: LAYOUT_VERSION,
        layout: layout.clone(),
    };
    postcard::to_allocvec(&versioned).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`BoardLayout`] produced by [`encode`].
///
/// # Errors
///
/// Returns `CodecError::UnsupportedVersion` for a foreign version byte, or
/// `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode(bytes: &[u8]) -> Result<BoardLayout, CodecError> {
    match bytes.first() {
        Some(&LAYOUT_VERSION) => {}
        Some(&found) => return Err(CodecError::UnsupportedVersion { found }),
        None => return Err(CodecError::Serialization("empty input".to_string())),
    }
    let versioned: VersionedLayout =
        postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))?;
    Ok(versioned.layout)
}
