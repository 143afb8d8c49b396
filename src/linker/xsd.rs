use tracing::debug;
use uuid::Uuid;

use super::{LinkerContext, find_document, resolve_all};
use crate::artifact::{Artifact, ArtifactType};
use crate::deriver::DerivedGraph;
use crate::error::{LinkResult, Result};

/// Resolves a schema document's `importedXsds`, `includedXsds` and
/// `redefinedXsds` by target namespace. Standalone XSD documents are tried
/// first, then WSDL documents whose target namespace matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct XsdLinker;

impl XsdLinker {
    pub fn link(
        &self,
        context: &dyn LinkerContext,
        primary: &mut Artifact,
        _graph: &mut DerivedGraph,
    ) -> Result<()> {
        let own = primary.uuid;
        let Some(references) = primary.schema_references_mut() else {
            return Ok(());
        };

        let lookup = |namespace: &str| -> LinkResult<Option<Uuid>> {
            match find_document(context, ArtifactType::XsdDocument, namespace, own)? {
                Some(uuid) => Ok(Some(uuid)),
                None => find_document(context, ArtifactType::WsdlDocument, namespace, own),
            }
        };
        resolve_all(&mut references.imported_xsds, "importedXsds", lookup)?;
        resolve_all(&mut references.included_xsds, "includedXsds", lookup)?;
        resolve_all(&mut references.redefined_xsds, "redefinedXsds", lookup)?;

        debug!(
            primary = %primary.name,
            remaining = primary.unresolved_count(),
            "schema references linked"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKind, DocumentType, SchemaReferences, Target, TargetType};
    use crate::linker::Criteria;

    /// XSD documents keyed by target namespace.
    struct Documents(Vec<Artifact>);

    impl LinkerContext for Documents {
        fn find_artifacts(
            &self,
            _: &str,
            artifact_type: &str,
            criteria: &Criteria,
        ) -> LinkResult<Vec<Artifact>> {
            Ok(self
                .0
                .iter()
                .filter(|a| a.artifact_type().type_name() == artifact_type)
                .filter(|a| criteria.iter().all(|(k, v)| a.property(k).as_deref() == Some(v)))
                .cloned()
                .collect())
        }
    }

    fn xsd(namespace: &str) -> Artifact {
        let mut doc = Artifact::document(&DocumentType::XsdDocument, format!("{}.xsd", namespace));
        doc.set_target_namespace(Some(namespace.to_string()));
        doc
    }

    #[test]
    fn test_links_document_references() {
        let common = xsd("urn:common");
        let mut primary = xsd("urn:orders");
        let sibling = xsd("urn:orders");
        if let Some(refs) = primary.schema_references_mut() {
            *refs = SchemaReferences {
                imported_xsds: vec![
                    Target::unresolved(TargetType::XsdDocument, "urn:common"),
                    Target::unresolved(TargetType::XsdDocument, "urn:nowhere"),
                ],
                included_xsds: vec![Target::unresolved(TargetType::XsdDocument, "urn:orders")],
                redefined_xsds: vec![],
            };
        }

        let context = Documents(vec![primary.clone(), common.clone(), sibling.clone()]);
        XsdLinker
            .link(&context, &mut primary, &mut DerivedGraph::new())
            .unwrap();

        let ArtifactKind::XsdDocument { references, .. } = &primary.kind else {
            unreachable!()
        };
        assert_eq!(references.imported_xsds.len(), 1);
        assert_eq!(references.imported_xsds[0].value(), common.uuid);
        // The include resolves to the other document in the namespace, not itself
        assert_eq!(references.included_xsds[0].value(), sibling.uuid);
        assert_eq!(primary.unresolved_count(), 0);
    }

    #[test]
    fn test_import_falls_back_to_wsdl_documents() {
        let mut wsdl = Artifact::document(&DocumentType::WsdlDocument, "svc.wsdl");
        wsdl.set_target_namespace(Some("urn:svc".to_string()));
        let mut primary = xsd("urn:orders");
        if let Some(refs) = primary.schema_references_mut() {
            refs.imported_xsds
                .push(Target::unresolved(TargetType::XsdDocument, "urn:svc"));
        }

        let context = Documents(vec![wsdl.clone()]);
        XsdLinker
            .link(&context, &mut primary, &mut DerivedGraph::new())
            .unwrap();

        let ArtifactKind::XsdDocument { references, .. } = &primary.kind else {
            unreachable!()
        };
        assert_eq!(references.imported_xsds[0].value(), wsdl.uuid);
    }

    #[test]
    fn test_non_schema_primary_is_untouched() {
        let mut primary = Artifact::document(&DocumentType::PolicyDocument, "p.xml");
        let before = primary.clone();
        XsdLinker
            .link(&Documents(vec![]), &mut primary, &mut DerivedGraph::new())
            .unwrap();
        assert_eq!(primary, before);
    }

    #[test]
    fn test_self_include_without_sibling_is_dropped() {
        let mut primary = xsd("urn:solo");
        if let Some(refs) = primary.schema_references_mut() {
            refs.included_xsds
                .push(Target::unresolved(TargetType::XsdDocument, "urn:solo"));
        }
        let context = Documents(vec![primary.clone()]);
        XsdLinker
            .link(&context, &mut primary, &mut DerivedGraph::new())
            .unwrap();
        assert_eq!(primary.unresolved_count(), 0);
        assert!(primary.relationships().is_empty());
    }
}
