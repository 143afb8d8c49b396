//! XML Schema deriver.

use roxmltree::Node;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{DerivedGraph, Deriver, XmlDeriver, derive_xml};
use crate::artifact::{Artifact, ArtifactKind, SchemaReferences, Target, TargetType};
use crate::error::Result;
use crate::linker::{LinkerContext, XsdLinker};
use crate::xml::{XSD_NS, XmlDeriverContext};

/// Top-level declarations picked up from a schema body, in emission order.
const DECLARATIONS: [(&str, ArtifactKind); 4] = [
    ("./xsd:element", ArtifactKind::ElementDeclaration),
    ("./xsd:attribute", ArtifactKind::AttributeDeclaration),
    ("./xsd:simpleType", ArtifactKind::SimpleTypeDeclaration),
    ("./xsd:complexType", ArtifactKind::ComplexTypeDeclaration),
];

/// Derives global element, attribute and type declarations from an XSD document.
#[derive(Debug, Default, Clone, Copy)]
pub struct XsdDeriver;

impl XsdDeriver {
    pub fn new() -> Self {
        Self
    }
}

impl XmlDeriver for XsdDeriver {
    fn configure_namespace_mappings(&self, context: &mut XmlDeriverContext) {
        context.add_namespace_mapping("xs", XSD_NS);
        context.add_namespace_mapping("xsd", XSD_NS);
    }

    fn derive_from_root(
        &self,
        primary: &mut Artifact,
        root: Node<'_, '_>,
        context: &XmlDeriverContext,
    ) -> Result<Vec<Artifact>> {
        primary.set_target_namespace(root.attribute("targetNamespace").map(str::to_string));
        record_schema_references(primary, root, context)?;

        let mut artifacts = derive_schema(root, context)?;
        // Nothing inside a schema references a sibling by identity, so
        // identities can be assigned after the fact.
        for artifact in &mut artifacts {
            artifact.uuid = Some(Uuid::new_v4());
        }
        Ok(artifacts)
    }
}

impl Deriver for XsdDeriver {
    fn derive(&self, primary: &mut Artifact, content: &[u8]) -> Result<DerivedGraph> {
        derive_xml(self, primary, content)
    }

    fn link(
        &self,
        context: &dyn LinkerContext,
        primary: &mut Artifact,
        graph: &mut DerivedGraph,
    ) -> Result<()> {
        XsdLinker.link(context, primary, graph)
    }
}

/// Scan the direct children of `schema` for named top-level declarations.
///
/// Every artifact takes the schema's own `targetNamespace` (empty when absent)
/// and carries no relationships and no identity.
pub(crate) fn derive_schema(
    schema: Node<'_, '_>,
    context: &XmlDeriverContext,
) -> Result<Vec<Artifact>> {
    let target_namespace = schema.attribute("targetNamespace").unwrap_or_default();
    let mut artifacts = Vec::new();

    for (expression, kind) in DECLARATIONS {
        for node in context.query(schema, expression)? {
            let Some(name) = node.attribute("name") else {
                trace!(expression, "skipping anonymous declaration");
                continue;
            };
            artifacts.push(
                Artifact::new(kind.clone(), name)
                    .with_namespace(target_namespace)
                    .with_nc_name(name),
            );
        }
    }

    debug!(
        target_namespace,
        declarations = artifacts.len(),
        "derived schema declarations"
    );
    Ok(artifacts)
}

/// Collect `xsd:import`, `xsd:include` and `xsd:redefine` references from
/// `schema` onto the primary document. All of them are unresolved until link.
pub(crate) fn record_schema_references(
    primary: &mut Artifact,
    schema: Node<'_, '_>,
    context: &XmlDeriverContext,
) -> Result<()> {
    let found = schema_references(schema, context)?;
    if let Some(references) = primary.schema_references_mut() {
        references.imported_xsds.extend(found.imported_xsds);
        references.included_xsds.extend(found.included_xsds);
        references.redefined_xsds.extend(found.redefined_xsds);
    }
    Ok(())
}

fn schema_references(
    schema: Node<'_, '_>,
    context: &XmlDeriverContext,
) -> Result<SchemaReferences> {
    let target_namespace = schema.attribute("targetNamespace").unwrap_or_default();
    let mut references = SchemaReferences::default();

    for import in context.query(schema, "./xsd:import")? {
        if let (Some(namespace), Some(_)) =
            (import.attribute("namespace"), import.attribute("schemaLocation"))
        {
            references
                .imported_xsds
                .push(Target::unresolved(TargetType::XsdDocument, namespace));
        }
    }

    for include in context.query(schema, "./xsd:include")? {
        if include.has_attribute("schemaLocation") {
            references
                .included_xsds
                .push(Target::unresolved(TargetType::XsdDocument, target_namespace));
        }
    }

    for redefine in context.query(schema, "./xsd:redefine")? {
        if redefine.has_attribute("schemaLocation") {
            references
                .redefined_xsds
                .push(Target::unresolved(TargetType::XsdDocument, target_namespace));
        }
    }

    Ok(references)
}
