use tracing::debug;
use uuid::Uuid;

use super::{LinkerContext, find_by_qname, find_document, resolve_all, resolve_slot};
use crate::artifact::{Artifact, ArtifactKind, ArtifactType};
use crate::deriver::DerivedGraph;
use crate::error::{LinkResult, Result};

/// Resolves WSDL references left open by derivation: part elements and
/// types, operation messages, binding port types and operations, port
/// bindings, and the document's `importedWsdls`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsdlLinker;

impl WsdlLinker {
    pub fn link(
        &self,
        context: &dyn LinkerContext,
        primary: &mut Artifact,
        graph: &mut DerivedGraph,
    ) -> Result<()> {
        let before = graph.unresolved_count();
        let own = primary.uuid;

        if let ArtifactKind::WsdlDocument { imported_wsdls, .. } = &mut primary.kind {
            resolve_all(imported_wsdls, "importedWsdls", |namespace| {
                find_document(context, ArtifactType::WsdlDocument, namespace, own)
            })?;
        }

        for artifact in graph.iter_mut() {
            link_artifact(context, artifact)?;
        }

        debug!(
            primary = %primary.name,
            unresolved = before,
            remaining = graph.unresolved_count(),
            "wsdl references linked"
        );
        Ok(())
    }
}

fn by_name<'a>(
    context: &'a dyn LinkerContext,
    candidates: &'static [ArtifactType],
) -> impl FnOnce(&str) -> LinkResult<Option<Uuid>> + 'a {
    move |reference| find_by_qname(context, candidates, reference)
}

fn link_artifact(context: &dyn LinkerContext, artifact: &mut Artifact) -> Result<()> {
    match &mut artifact.kind {
        ArtifactKind::Part { element, xsd_type } => {
            resolve_slot(
                element,
                "element",
                by_name(context, &[ArtifactType::ElementDeclaration]),
            )?;
            resolve_slot(
                xsd_type,
                "type",
                by_name(context, &[
                    ArtifactType::ComplexTypeDeclaration,
                    ArtifactType::SimpleTypeDeclaration,
                ]),
            )?;
        }
        ArtifactKind::OperationInput { message }
        | ArtifactKind::OperationOutput { message }
        | ArtifactKind::Fault { message } => {
            resolve_slot(message, "message", by_name(context, &[ArtifactType::Message]))?;
        }
        ArtifactKind::Binding { port_type, .. } => {
            resolve_slot(port_type, "portType", by_name(context, &[ArtifactType::PortType]))?;
        }
        ArtifactKind::BindingOperation { operation, .. } => {
            resolve_slot(operation, "operation", by_name(context, &[ArtifactType::Operation]))?;
        }
        ArtifactKind::Port { binding, .. } => {
            resolve_slot(binding, "binding", by_name(context, &[ArtifactType::Binding]))?;
        }
        ArtifactKind::XsdDocument { .. }
        | ArtifactKind::WsdlDocument { .. }
        | ArtifactKind::PolicyDocument
        | ArtifactKind::ExtendedDocument { .. }
        | ArtifactKind::ElementDeclaration
        | ArtifactKind::AttributeDeclaration
        | ArtifactKind::SimpleTypeDeclaration
        | ArtifactKind::ComplexTypeDeclaration
        | ArtifactKind::Message { .. }
        | ArtifactKind::PortType { .. }
        | ArtifactKind::Operation { .. }
        | ArtifactKind::BindingOperationInput
        | ArtifactKind::BindingOperationOutput
        | ArtifactKind::BindingOperationFault
        | ArtifactKind::SoapBinding { .. }
        | ArtifactKind::SoapAddress { .. }
        | ArtifactKind::WsdlService { .. } => {}
    }
    Ok(())
}
