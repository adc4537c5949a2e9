//! Patchwright Engine -- live reconciliation of template overrides.
//!
//! Operators publish override snapshots into an [`OverrideStore`]. A
//! [`ReconciliationEngine`] brings a running host in line with the latest
//! snapshot for each kind: it patches templates, clones new templates from
//! existing ones, patches everything already spawned from them, and tears
//! clones down again when a later snapshot stops asking for them. The host
//! is reached only through the [`HostRegistry`] trait.
//!
//! [`OverrideStore`]: store::OverrideStore
//! [`ReconciliationEngine`]: engine::ReconciliationEngine
//! [`HostRegistry`]: host::HostRegistry
//!
//! # Quick Start
//!
//! ```
//! use std::collections::BTreeMap;
//! use patchwright_engine::prelude::*;
//!
//! let mut host = MemoryHost::new();
//! let deer = host.add_creature("Deer", CreatureData { health: 30.0, ..Default::default() });
//!
//! let store = OverrideStore::new();
//! let mut overrides = BTreeMap::new();
//! overrides.insert("Deer".to_owned(), MonsterDescriptor { health: Some(50), ..Default::default() });
//! store.publish(overrides);
//!
//! let mut engine = ReconciliationEngine::new();
//! let reports = engine.poll(&mut host, &store);
//! assert_eq!(reports.len(), 1);
//! assert_eq!(host.creature_data(deer).unwrap().health, 50.0);
//! ```

#![deny(unsafe_code)]

pub mod apply;
pub mod capture;
pub mod clone;
pub mod engine;
pub mod handle;
pub mod host;
pub mod memory_host;
pub mod model;
pub mod store;
pub mod tracker;

use patchwright_core::{CodecError, EntityKind};

/// Re-export the core crate for convenience.
pub use patchwright_core;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the store and the reconciliation engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The host registry for this kind is not initialized yet. The pass
    /// touched nothing and will run on the next poll.
    #[error("{kind} registry is not ready")]
    RegistryUnavailable { kind: EntityKind },

    /// A replicated payload failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use patchwright_core::prelude::*;

    pub use crate::apply::Apply;
    pub use crate::capture::{capture_creature, capture_item, capture_piece};
    pub use crate::clone::{CloneManager, CloneRecord, Teardown};
    pub use crate::engine::{KindState, PassReport, Reconcile, ReconciliationEngine};
    pub use crate::handle::{Handle, HandleAllocator};
    pub use crate::host::{ContainerId, HostRegistry, TemplateIndex};
    pub use crate::memory_host::MemoryHost;
    pub use crate::model::{
        ContainerData, CreatureData, FermenterConversion, FermenterData, FireplaceData, ItemData,
        ItemStack, PieceData, Recipe, SmelterConversion, SmelterData, WearData,
    };
    pub use crate::store::{ChangeNotice, OverrideStore, Snapshot, Stored};
    pub use crate::tracker::{LiveInstanceTracker, StackRef};
    pub use crate::EngineError;
}
