//! # artifact-deriver Library
//!
//! Derives SOA artifacts (schema components, WSDL services and bindings,
//! policy expressions) from XSD, WSDL and WS-Policy documents, then links
//! the symbolic references between them against a repository of previously
//! persisted artifacts.
//!
//! A run moves each document through derive, persist and link:
//!
//! ```text
//! document bytes --Deriver::derive--> primary + DerivedGraph (sentinel refs)
//!                --repository-----> persisted artifacts
//!                --Deriver::link--> resolved relationships
//! ```
//!
//! Derivers are looked up by [`DocumentType`] in a [`DeriverRegistry`];
//! unknown types fall back to a deriver that produces nothing.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod deriver;
pub mod engine;
pub mod error;
pub mod file_discovery;
pub mod linker;
pub mod output;
pub mod qname;
pub mod registry;
pub mod repository;
pub mod scratchpad;
pub mod xml;

pub use artifact::{Artifact, ArtifactKind, ArtifactType, DocumentType, Target, TargetType};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigManager};
pub use deriver::{DerivedGraph, Deriver, NullDeriver, PolicyDeriver, WsdlDeriver, XsdDeriver};
pub use engine::{
    DerivationEngine, DerivationPhase, DerivationProgress, DerivationResults, DocumentResult,
    DocumentStatus, EngineConfig, PerformanceMetrics, ProgressCallback,
};
pub use error::{DeriveError, LinkError};
pub use file_discovery::{DiscoveredDocument, DiscoveryStats, FileDiscovery};
pub use linker::{Criteria, LinkerContext, WsdlLinker, XsdLinker};
pub use output::Output;
pub use qname::QName;
pub use registry::{ConfiguredProvider, DeriverProvider, DeriverRegistry, DeriverRegistryBuilder};
pub use repository::InMemoryRepository;
pub use scratchpad::IndexedArtifacts;
