//! Patchwright Core -- sparse override descriptors and their wire codec.
//!
//! An override descriptor is a sparse record describing which fields of a
//! named template (an item kind, a buildable piece kind, or a creature kind)
//! should be replaced. Every field is independently optional, so the codec
//! writes a single bitmask up front and then only the fields whose bit is
//! set. A descriptor that overrides one field costs a handful of bytes on the
//! wire no matter how many fields the record type declares.
//!
//! # Modules
//!
//! - [`buffer`]: Little-endian byte-buffer primitives (`i32`, `f32`, `bool`,
//!   7-bit length-prefixed strings).
//! - [`descriptor`]: The three descriptor record types and their nested
//!   value types.
//! - [`codec`]: Per-kind bitmask encode/decode plus whole-snapshot payloads.
//! - [`hash`]: Stable cross-process name hash and payload fingerprints.
//!
//! # Quick Start
//!
//! ```
//! use patchwright_core::prelude::*;
//!
//! let deer = MonsterDescriptor {
//!     health: Some(50),
//!     ..Default::default()
//! };
//!
//! let bytes = encode(&deer);
//! // bitmask (4 bytes) + health (4 bytes)
//! assert_eq!(bytes.len(), 8);
//! assert_eq!(decode::<MonsterDescriptor>(&bytes).unwrap(), deer);
//! ```

#![deny(unsafe_code)]

pub mod buffer;
pub mod codec;
pub mod descriptor;
pub mod hash;

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The three template families an override can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Item,
    Piece,
    Monster,
}

impl EntityKind {
    /// All kinds, in the order a full reconciliation visits them.
    pub const ALL: [EntityKind; 3] = [EntityKind::Item, EntityKind::Piece, EntityKind::Monster];

    /// Lower-case label used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Item => "item",
            EntityKind::Piece => "piece",
            EntityKind::Monster => "monster",
        }
    }

    /// Dense index, handy for per-kind arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while decoding a descriptor or snapshot payload.
///
/// Decoding is atomic: when any of these is returned, no partially populated
/// descriptor escapes to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The buffer ended before a primitive could be read.
    #[error("buffer truncated at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A 7-bit encoded string length ran past five bytes or exceeded `i32::MAX`.
    #[error("invalid string length prefix at offset {offset}")]
    InvalidLength { offset: usize },

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A list or snapshot element count was negative.
    #[error("negative element count {count}")]
    NegativeCount { count: i32 },

    /// A build requirement string did not match `resource:amount[:recover]`.
    #[error("malformed requirement '{text}': {reason}")]
    MalformedRequirement { text: String, reason: String },

    /// A damage modifier value outside the known range.
    #[error("unknown damage modifier value {value}")]
    UnknownDamageModifier { value: i32 },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::buffer::{PackageReader, PackageWriter};
    pub use crate::codec::{decode, decode_snapshot, encode, encode_snapshot, Descriptor};
    pub use crate::descriptor::{
        ContainerSpec, Conversion, DamageModifier, DamageModifiers, DamageTypes,
        FermenterSpec, FireplaceSpec, ItemDescriptor, MonsterDescriptor, PieceDescriptor,
        Requirement, SmelterSpec,
    };
    pub use crate::hash::{fingerprint, stable_hash};
    pub use crate::{CodecError, EntityKind};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_index_densely_in_reconcile_order() {
        let indices: Vec<usize> = EntityKind::ALL.iter().map(|k| k.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(EntityKind::ALL[0], EntityKind::Item);
    }

    #[test]
    fn codec_error_messages_name_the_offset() {
        let err = CodecError::Truncated {
            offset: 12,
            needed: 4,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "buffer truncated at offset 12: needed 4 bytes, 1 remaining"
        );
    }
}
