//! Derivers turn a primary document's bytes into derived artifacts and later
//! link the references that point outside that document.

pub mod policy;
pub mod wsdl;
pub mod xsd;

use roxmltree::Node;
use tracing::debug;
use uuid::Uuid;

use crate::artifact::{Artifact, Target, TargetType};
use crate::error::Result;
use crate::linker::LinkerContext;
use crate::xml::{self, XmlDeriverContext};

pub use policy::PolicyDeriver;
pub use wsdl::WsdlDeriver;
pub use xsd::XsdDeriver;

/// Artifacts derived from one primary document, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedGraph {
    artifacts: Vec<Artifact>,
}

impl DerivedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.artifacts.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Artifact> {
        self.artifacts.iter_mut()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }

    /// Unresolved relationship targets across all artifacts.
    pub fn unresolved_count(&self) -> usize {
        self.artifacts.iter().map(Artifact::unresolved_count).sum()
    }

    /// Relationship targets across all artifacts, resolved or not.
    pub fn relationship_count(&self) -> usize {
        self.artifacts.iter().map(|a| a.relationships().len()).sum()
    }

    /// Point every artifact lacking a related document at `primary`.
    pub fn relate_to(&mut self, primary: &mut Artifact) {
        let uuid = *primary.uuid.get_or_insert_with(Uuid::new_v4);
        let target_type = TargetType::RelatedDocument(primary.artifact_type());
        for artifact in &mut self.artifacts {
            if artifact.related_document.is_none() {
                artifact.related_document = Some(Target::resolved(target_type, uuid));
            }
        }
    }
}

impl From<Vec<Artifact>> for DerivedGraph {
    fn from(artifacts: Vec<Artifact>) -> Self {
        Self { artifacts }
    }
}

impl IntoIterator for DerivedGraph {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.into_iter()
    }
}

impl<'a> IntoIterator for &'a DerivedGraph {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}

/// Parses one document kind into derived artifacts and links their outside references.
///
/// Implementations hold no per-document state and may be shared across threads.
pub trait Deriver: Send + Sync {
    /// Derive artifacts from `content`. May record document-level facts (target
    /// namespace, imports) on `primary`. A parse failure aborts the whole call.
    fn derive(&self, primary: &mut Artifact, content: &[u8]) -> Result<DerivedGraph>;

    /// Resolve or discard every unresolved target in `primary` and `graph`.
    /// Everything in `graph` must already be visible to `context`.
    fn link(
        &self,
        context: &dyn LinkerContext,
        primary: &mut Artifact,
        graph: &mut DerivedGraph,
    ) -> Result<()>;
}

/// Deriver used for any document type without a registered deriver.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDeriver;

impl Deriver for NullDeriver {
    fn derive(&self, _primary: &mut Artifact, _content: &[u8]) -> Result<DerivedGraph> {
        Ok(DerivedGraph::new())
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

/// Hooks for derivers that work on an XML document tree.
pub trait XmlDeriver: Send + Sync {
    /// Register the prefixes this deriver's queries use.
    fn configure_namespace_mappings(&self, context: &mut XmlDeriverContext);

    fn derive_from_root(
        &self,
        primary: &mut Artifact,
        root: Node<'_, '_>,
        context: &XmlDeriverContext,
    ) -> Result<Vec<Artifact>>;
}

/// Shared XML derivation driver: decode, parse, run the deriver on the root
/// element, then relate every produced artifact to `primary`.
pub fn derive_xml<D>(deriver: &D, primary: &mut Artifact, content: &[u8]) -> Result<DerivedGraph>
where
    D: XmlDeriver + ?Sized,
{
    let text = xml::decode(content)?;
    let document = xml::parse(text)?;

    let mut context = XmlDeriverContext::default();
    deriver.configure_namespace_mappings(&mut context);

    let artifacts = deriver.derive_from_root(primary, document.root_element(), &context)?;
    let mut graph = DerivedGraph::from(artifacts);
    graph.relate_to(primary);

    debug!(
        primary = %primary.name,
        derived = graph.len(),
        unresolved = graph.unresolved_count(),
        "derived document"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKind, ArtifactType, DocumentType};
    use crate::error::{DeriveError, LinkResult};
    use crate::linker::Criteria;

    struct EmptyContext;

    impl LinkerContext for EmptyContext {
        fn find_artifacts(
            &self,
            _model: &str,
            _artifact_type: &str,
            _criteria: &Criteria,
        ) -> LinkResult<Vec<Artifact>> {
            Ok(Vec::new())
        }
    }

    struct RootNameDeriver;

    impl XmlDeriver for RootNameDeriver {
        fn configure_namespace_mappings(&self, context: &mut XmlDeriverContext) {
            context.add_namespace_mapping("x", "urn:x");
        }

        fn derive_from_root(
            &self,
            _primary: &mut Artifact,
            root: Node<'_, '_>,
            context: &XmlDeriverContext,
        ) -> Result<Vec<Artifact>> {
            let mut out = Vec::new();
            for item in context.query(root, "./x:item")? {
                let name = item.attribute("name").unwrap_or_default();
                out.push(Artifact::new(ArtifactKind::ElementDeclaration, name));
            }
            Ok(out)
        }
    }

    #[test]
    fn test_null_deriver_is_inert() {
        let mut primary = Artifact::document(&DocumentType::Extended("Unknown".into()), "a.bin");
        let mut graph = NullDeriver.derive(&mut primary, b"\x00\x01 not xml").unwrap();
        assert!(graph.is_empty());

        NullDeriver
            .link(&EmptyContext, &mut primary, &mut graph)
            .unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_derive_xml_relates_to_primary() {
        let mut primary = Artifact::document(&DocumentType::XsdDocument, "items.xml");
        let content = br#"<root xmlns:x="urn:x"><x:item name="a"/><x:item name="b"/></root>"#;

        let graph = derive_xml(&RootNameDeriver, &mut primary, content).unwrap();
        assert_eq!(graph.len(), 2);

        for artifact in &graph {
            let related = artifact.related_document.as_ref().unwrap();
            assert_eq!(related.value(), primary.uuid);
            assert_eq!(
                related.target_type(),
                TargetType::RelatedDocument(ArtifactType::XsdDocument)
            );
        }
    }

    #[test]
    fn test_relate_to_keeps_explicit_related_document() {
        let explicit = Uuid::new_v4();
        let mut primary = Artifact::new(ArtifactKind::PolicyDocument, "p.xml");
        let mut graph = DerivedGraph::from(vec![
            Artifact::new(ArtifactKind::ElementDeclaration, "a"),
            Artifact {
                related_document: Some(Target::resolved(
                    TargetType::RelatedDocument(ArtifactType::XsdDocument),
                    explicit,
                )),
                ..Artifact::new(ArtifactKind::ElementDeclaration, "b")
            },
        ]);

        graph.relate_to(&mut primary);

        // Primary without identity gets one
        assert!(primary.uuid.is_some());
        assert_eq!(
            graph.artifacts()[0].related_document.as_ref().unwrap().value(),
            primary.uuid
        );
        assert_eq!(
            graph.artifacts()[1].related_document.as_ref().unwrap().value(),
            Some(explicit)
        );
    }

    #[test]
    fn test_derive_xml_parse_error_returns_nothing() {
        let mut primary = Artifact::document(&DocumentType::XsdDocument, "broken.xml");
        let result = derive_xml(&RootNameDeriver, &mut primary, b"<root><x:item></root>");
        assert!(matches!(result, Err(DeriveError::Parse { .. })));
    }

    #[test]
    fn test_graph_counts() {
        let graph = DerivedGraph::from(vec![Artifact::new(
            ArtifactKind::OperationInput {
                message: Some(Target::unresolved(TargetType::Message, "{urn:x}M")),
            },
            "M",
        )]);
        assert_eq!(graph.unresolved_count(), 1);
        assert_eq!(graph.relationship_count(), 1);
    }
}
