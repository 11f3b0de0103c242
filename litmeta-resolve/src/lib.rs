//! # litmeta-resolve
//!
//! Resolves descriptive metadata for a literary work (original title, genre,
//! country/tradition, first-publication year, narrated period, synopsis) by
//! merging candidates from heterogeneous, partially unreliable sources.
//!
//! # Architecture
//!
//! - [`gates`]: pure predicates rejecting contextually wrong candidates
//! - [`policy`]: per-field source priority, gate and confidence
//! - [`sources`]: structured source adapters behind [`sources::SourceCatalog`]
//! - [`entity`]: knowledge-graph identifier resolution and field extraction
//! - [`router`]: shared availability state for generative providers
//! - [`providers`]: generative fallback adapters
//! - [`orchestrator`]: drives one [`Record`] to a terminal status
//! - [`record`]: record, provenance and status columns
//!
//! ```no_run
//! use litmeta_resolve::{EngineConfig, Record, Resolver};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), litmeta_resolve::ResolveError> {
//! let config = EngineConfig::load(None)?;
//! litmeta_common::logging::init_tracing(&config.logging);
//!
//! let router = Arc::new(config.build_router());
//! let resolver = Resolver::from_config(&config, router)?;
//!
//! let mut record = Record::new("Savaş ve Barış", "Lev Tolstoy");
//! resolver.resolve(&mut record).await?;
//! println!("{:?}", record.to_row());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod gates;
pub mod orchestrator;
pub mod policy;
pub mod providers;
pub mod record;
pub mod router;
pub mod sources;
pub mod types;

pub use config::EngineConfig;
pub use error::{ResolveError, ResolveResult};
pub use gates::{GateContext, GateKind, GateLexicon, GateResult, QualityGates};
pub use orchestrator::{Resolver, ResolverSettings};
pub use policy::{FieldPolicy, FieldRule};
pub use providers::{FallbackRequest, GenerativeProvider, ProviderReply, WebSearch};
pub use record::{Record, ResolutionStatus};
pub use router::{Availability, CallOutcome, QuotaRouter};
pub use sources::{HttpSources, SourceCatalog, SourceFields, SourceSnapshot, WorkQuery};
pub use types::{Candidate, Field, Provenance, SourceId, SourceKind};
