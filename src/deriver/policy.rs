//! WS-Policy documents: parsed for well-formedness only.

use roxmltree::Node;

use super::{DerivedGraph, Deriver, XmlDeriver, derive_xml};
use crate::artifact::Artifact;
use crate::error::Result;
use crate::linker::LinkerContext;
use crate::xml::XmlDeriverContext;

pub const WSP_NS: &str = "http://www.w3.org/ns/ws-policy";

/// Deriver for policy documents. Policy expressions are not interpreted, so
/// nothing is derived, but a malformed document is still rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyDeriver;

impl PolicyDeriver {
    pub fn new() -> Self {
        Self
    }
}

impl XmlDeriver for PolicyDeriver {
    fn configure_namespace_mappings(&self, context: &mut XmlDeriverContext) {
        context.add_namespace_mapping("wsp", WSP_NS);
    }

    fn derive_from_root(
        &self,
        _primary: &mut Artifact,
        _root: Node<'_, '_>,
        _context: &XmlDeriverContext,
    ) -> Result<Vec<Artifact>> {
        Ok(Vec::new())
    }
}

impl Deriver for PolicyDeriver {
    fn derive(&self, primary: &mut Artifact, content: &[u8]) -> Result<DerivedGraph> {
        derive_xml(self, primary, content)
    }

    fn link(
        &self,
        _context: &dyn LinkerContext,
        _primary: &mut Artifact,
        _graph: &mut DerivedGraph,
    ) -> Result<()> {
        Ok(())
    }
}
