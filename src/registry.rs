//! Deriver lookup by document type.
//!
//! The registry is assembled once at startup through [`DeriverRegistryBuilder`]
//! and is read-only afterwards. Unknown types get a [`NullDeriver`], never an
//! error.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::artifact::{Artifact, DocumentType};
use crate::deriver::{
    DerivedGraph, Deriver, NullDeriver, PolicyDeriver, WsdlDeriver, XsdDeriver,
};
use crate::error::{DeriveError, Result};
use crate::linker::LinkerContext;

/// Source of derivers for extended document types.
pub trait DeriverProvider {
    /// Derivers keyed by extended type name.
    fn create_artifact_derivers(&self) -> HashMap<String, Arc<dyn Deriver>>;
}

/// Built-in deriver for `document_type`, if it has one.
pub fn builtin_deriver(document_type: &DocumentType) -> Option<Arc<dyn Deriver>> {
    match document_type {
        DocumentType::XsdDocument => Some(Arc::new(XsdDeriver::new())),
        DocumentType::WsdlDocument => Some(Arc::new(WsdlDeriver::new())),
        DocumentType::PolicyDocument => Some(Arc::new(PolicyDeriver::new())),
        DocumentType::Extended(_) => None,
    }
}

/// Deriver contributed for an extended type. Failures surface as
/// [`DeriveError::Plugin`] for the one document being processed.
struct PluginDeriver {
    extended_type: String,
    inner: Arc<dyn Deriver>,
}

impl PluginDeriver {
    fn wrap(&self, err: DeriveError) -> DeriveError {
        match err {
            DeriveError::Plugin { .. } => err,
            other => DeriveError::Plugin {
                artifact_type: self.extended_type.clone(),
                details: other.to_string(),
            },
        }
    }
}

impl Deriver for PluginDeriver {
    fn derive(&self, primary: &mut Artifact, content: &[u8]) -> Result<DerivedGraph> {
        self.inner
            .derive(primary, content)
            .map_err(|err| self.wrap(err))
    }

    fn link(
        &self,
        context: &dyn LinkerContext,
        primary: &mut Artifact,
        graph: &mut DerivedGraph,
    ) -> Result<()> {
        self.inner
            .link(context, primary, graph)
            .map_err(|err| self.wrap(err))
    }
}

pub struct DeriverRegistry {
    builtin: HashMap<DocumentType, Arc<dyn Deriver>>,
    extended: HashMap<String, Arc<dyn Deriver>>,
    fallback: Arc<dyn Deriver>,
}

impl DeriverRegistry {
    /// Registry with the built-in XSD, WSDL and policy derivers.
    pub fn new() -> Self {
        Self::builder().with_builtins().build()
    }

    pub fn builder() -> DeriverRegistryBuilder {
        DeriverRegistryBuilder::default()
    }

    pub fn get(&self, document_type: &DocumentType) -> &dyn Deriver {
        self.lookup(document_type).as_ref()
    }

    /// Owned handle, for moving a deriver onto a worker thread.
    pub fn shared(&self, document_type: &DocumentType) -> Arc<dyn Deriver> {
        Arc::clone(self.lookup(document_type))
    }

    pub fn is_registered(&self, document_type: &DocumentType) -> bool {
        match document_type {
            DocumentType::Extended(name) => self.extended.contains_key(name),
            builtin => self.builtin.contains_key(builtin),
        }
    }

    /// Registered extended type names, sorted.
    pub fn extended_types(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.extended.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, document_type: &DocumentType) -> &Arc<dyn Deriver> {
        let found = match document_type {
            DocumentType::Extended(name) => self.extended.get(name),
            builtin => self.builtin.get(builtin),
        };
        found.unwrap_or_else(|| {
            debug!(%document_type, "no deriver registered, using null deriver");
            &self.fallback
        })
    }
}

impl Default for DeriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builtin: Vec<_> = self.builtin.keys().map(ToString::to_string).collect();
        builtin.sort_unstable();
        f.debug_struct("DeriverRegistry")
            .field("builtin", &builtin)
            .field("extended", &self.extended_types())
            .finish()
    }
}

#[derive(Default)]
pub struct DeriverRegistryBuilder {
    builtin: HashMap<DocumentType, Arc<dyn Deriver>>,
    extended: HashMap<String, Arc<dyn Deriver>>,
}

impl DeriverRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins(mut self) -> Self {
        for document_type in [
            DocumentType::XsdDocument,
            DocumentType::WsdlDocument,
            DocumentType::PolicyDocument,
        ] {
            if let Some(deriver) = builtin_deriver(&document_type) {
                self.builtin.insert(document_type, deriver);
            }
        }
        self
    }

    /// Register `deriver` for `document_type`, replacing any earlier one.
    /// Extended types are wrapped so their failures stay per-document.
    pub fn with_deriver(mut self, document_type: DocumentType, deriver: Arc<dyn Deriver>) -> Self {
        match document_type {
            DocumentType::Extended(name) => {
                let plugin = PluginDeriver {
                    extended_type: name.clone(),
                    inner: deriver,
                };
                self.extended.insert(name, Arc::new(plugin));
            }
            builtin => {
                self.builtin.insert(builtin, deriver);
            }
        }
        self
    }

    /// Add every deriver `provider` contributes. Later providers win on
    /// duplicate type names.
    pub fn with_provider(mut self, provider: &dyn DeriverProvider) -> Self {
        let derivers = provider.create_artifact_derivers();
        info!(count = derivers.len(), "registering extended derivers");
        for (name, deriver) in derivers {
            self = self.with_deriver(DocumentType::Extended(name), deriver);
        }
        self
    }

    pub fn build(self) -> DeriverRegistry {
        DeriverRegistry {
            builtin: self.builtin,
            extended: self.extended,
            fallback: Arc::new(NullDeriver),
        }
    }
}

/// Provider that maps extended type names onto built-in derivers, driven by
/// the `[derivers.extended]` configuration table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfiguredProvider {
    aliases: BTreeMap<String, DocumentType>,
}

impl ConfiguredProvider {
    /// Parse `extended type → built-in document type` aliases.
    pub fn from_aliases(aliases: &BTreeMap<String, String>) -> Result<Self> {
        let mut parsed = BTreeMap::new();
        for (extended, target) in aliases {
            let document_type: DocumentType = target.parse().map_err(DeriveError::Config)?;
            if !document_type.is_builtin() {
                return Err(DeriveError::Config(format!(
                    "Extended type '{}' must alias a built-in document type, got '{}'",
                    extended, target
                )));
            }
            parsed.insert(extended.clone(), document_type);
        }
        Ok(Self { aliases: parsed })
    }
}

impl DeriverProvider for ConfiguredProvider {
    fn create_artifact_derivers(&self) -> HashMap<String, Arc<dyn Deriver>> {
        self.aliases
            .iter()
            .filter_map(|(name, target)| builtin_deriver(target).map(|d| (name.clone(), d)))
            .collect()
    }
}
