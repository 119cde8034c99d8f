//! Declarative configuration-dependency graph for embedded peripheral
//! configuration.
//!
//! A [`Session`] holds typed configuration symbols grouped into instances
//! (`core`, `sdramc0`, `tmr1`, ...). Instances declare rules that recompute
//! a downstream symbol from an ordered list of upstream symbols, and output
//! slots whose single active [`ArtifactDescriptor`] is chosen from
//! discriminator symbols.
//!
//! Every external change runs as one synchronous, journaled pass: the
//! [`PropagationEngine`] cascades depth-first through the dispatch table,
//! affected slots are reselected, and the pass either commits as a whole or
//! is rolled back and the responsible instance aborted.

pub mod artifact;
pub mod context;
pub mod domain;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
mod pass;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod symbol;

pub use artifact::{
    ArtifactDescriptor, ArtifactKind, ArtifactSelector, ArtifactTable, Condition, Slot, SlotRef,
    SlotState,
};
pub use context::Context;
pub use domain::{Domain, EnumOption};
pub use engine::{PropagationEngine, RecomputeFn, Rule, RuleRef};
pub use error::{ConfigError, Result};
pub use event::{Cause, ChangeEvent, Effect};
pub use history::{ArtifactSwitch, ChangeRecord, History};
pub use session::{CascadeReport, Instance, InstanceBuilder, InstanceState, Session};
pub use snapshot::{ActiveArtifact, Snapshot, SymbolRecord};
pub use store::SymbolStore;
pub use symbol::{Symbol, SymbolId, SymbolKind, SymbolRef, SymbolSpec, Value};
