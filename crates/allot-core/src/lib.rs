//! allot-core: unit partitioning and coverage-driven work allocation for
//! annotation experiments.
//!
//! A corpus of items is split once, at experiment start, into fixed-size
//! named units. Workers register and request allocations; the engine hands
//! each worker units it has not seen, steering everyone toward units that
//! still lack the configured minimum number of independent annotations.
//! All bookkeeping lives in a durable metadata namespace so decisions
//! survive process restarts.
//!
//! # Conventions
//!
//! - **Errors**: library operations return typed errors
//!   ([`ExperimentError`], [`store::StoreError`]) with machine-readable
//!   codes; `anyhow` belongs at binary boundaries.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod allocate;
pub mod error;
pub mod experiment;
pub mod lock;
pub mod metadata;
pub mod partition;
pub mod store;
pub mod toolconf;

pub use error::{ErrorCode, ExperimentError};
pub use experiment::{Experiment, ExperimentOptions, UnitMap};
pub use partition::{Item, Unit, UnitMember};
pub use store::{BlobStore, FsStore, MemoryStore, StoreError};
pub use toolconf::Entity;
