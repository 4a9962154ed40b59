//! Chemical-entity extraction for patent and scientific text.
//!
//! The pipeline locates mentions of chemical substances, classifies them
//! into a typed taxonomy, validates each mention, resolves mentions to
//! canonical structures through a tiered lookup chain, and links canonical
//! forms to molecule records.
pub mod cache;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod extract;
pub mod link;
pub mod ner;
pub mod ratelimit;
pub mod registry;
pub mod resolve;
pub mod services;
pub mod text;
pub mod types;
pub mod validate;

pub use config::{ExtractionConfig, LinkerConfig, NerConfig, ResolverConfig};
pub use dictionary::ChemDictionary;
pub use error::{ChemError, Result};
pub use extract::{ClaimExtraction, ExtractionResult, Extractor, TechnicalFeature};
pub use link::MoleculeLinker;
pub use ner::NerPredictor;
pub use resolve::Resolver;
pub use types::{
    EntitySource, EntityType, ExternalIds, MoleculeLink, RawEntity, ResolvedEntity,
};
