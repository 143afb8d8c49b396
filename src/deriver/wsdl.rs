//! WSDL 1.1 deriver.
//!
//! Derivation runs in fixed phases over one [`IndexedArtifacts`] scratchpad:
//! embedded schemas, messages, port types, bindings, then services. A phase
//! only looks up artifacts from earlier phases; anything it cannot find
//! locally becomes an unresolved target for the linker.

use roxmltree::Node;
use tracing::{debug, trace};
use uuid::Uuid;

use super::xsd::{derive_schema, record_schema_references};
use super::{DerivedGraph, Deriver, XmlDeriver, derive_xml};
use crate::artifact::{Artifact, ArtifactKind, Target, TargetType};
use crate::error::Result;
use crate::linker::{LinkerContext, WsdlLinker, XsdLinker};
use crate::qname::QName;
use crate::scratchpad::IndexedArtifacts;
use crate::xml::{SOAP_NS, WSDL_NS, XSD_NS, XmlDeriverContext, resolve_qname};

pub const DEFAULT_BINDING_NAME: &str = "wsdl:binding";
pub const DEFAULT_SERVICE_NAME: &str = "wsdl:service";
pub const DEFAULT_PORT_NAME: &str = "wsdl:port";
pub const DEFAULT_BINDING_INPUT_NAME: &str = "wsdl:input";
pub const DEFAULT_BINDING_OUTPUT_NAME: &str = "wsdl:output";
pub const DEFAULT_BINDING_FAULT_NAME: &str = "wsdl:fault";
pub const SOAP_BINDING_NAME: &str = "soap:binding";
pub const SOAP_ADDRESS_NAME: &str = "soap:address";

#[derive(Debug, Default, Clone, Copy)]
pub struct WsdlDeriver;

impl WsdlDeriver {
    pub fn new() -> Self {
        Self
    }
}

impl XmlDeriver for WsdlDeriver {
    fn configure_namespace_mappings(&self, context: &mut XmlDeriverContext) {
        context.add_namespace_mapping("xs", XSD_NS);
        context.add_namespace_mapping("xsd", XSD_NS);
        context.add_namespace_mapping("wsdl", WSDL_NS);
        context.add_namespace_mapping("soap", SOAP_NS);
    }

    fn derive_from_root(
        &self,
        primary: &mut Artifact,
        root: Node<'_, '_>,
        context: &XmlDeriverContext,
    ) -> Result<Vec<Artifact>> {
        let target_namespace = root.attribute("targetNamespace");
        primary.set_target_namespace(target_namespace.map(str::to_string));
        record_wsdl_imports(primary, root, context)?;

        let mut walk = DefinitionsWalk {
            context,
            target_namespace: target_namespace.unwrap_or_default(),
            pad: IndexedArtifacts::new(),
        };

        walk.schemas(primary, root)?;
        walk.messages(root)?;
        walk.port_types(root)?;
        walk.bindings(root)?;
        walk.services(root)?;

        Ok(walk.pad.into_artifacts())
    }
}

impl Deriver for WsdlDeriver {
    fn derive(&self, primary: &mut Artifact, content: &[u8]) -> Result<DerivedGraph> {
        derive_xml(self, primary, content)
    }

    fn link(
        &self,
        context: &dyn LinkerContext,
        primary: &mut Artifact,
        graph: &mut DerivedGraph,
    ) -> Result<()> {
        XsdLinker.link(context, primary, graph)?;
        WsdlLinker.link(context, primary, graph)
    }
}

fn record_wsdl_imports(
    primary: &mut Artifact,
    root: Node<'_, '_>,
    context: &XmlDeriverContext,
) -> Result<()> {
    let imports = context.query(root, ".//wsdl:import")?;
    if let ArtifactKind::WsdlDocument { imported_wsdls, .. } = &mut primary.kind {
        for import in imports {
            if let Some(namespace) = import.attribute("namespace") {
                imported_wsdls.push(Target::unresolved(TargetType::WsdlDocument, namespace));
            }
        }
    }
    Ok(())
}

/// Target pointing at an artifact created in this pass.
fn child_target(child: &Artifact, target_type: TargetType) -> Option<Target> {
    child.uuid.map(|uuid| Target::resolved(target_type, uuid))
}

/// Resolved target when the scratchpad had a hit, otherwise an unresolved one
/// carrying `name` for the linker.
fn local_reference(found: Option<&Artifact>, target_type: TargetType, name: &QName) -> Target {
    match found.and_then(|artifact| artifact.uuid) {
        Some(uuid) => {
            trace!(%name, ?target_type, "resolved locally");
            Target::resolved(target_type, uuid)
        }
        None => {
            trace!(%name, ?target_type, "deferred to link");
            Target::unresolved(target_type, name)
        }
    }
}

struct DefinitionsWalk<'c, 'ns> {
    context: &'c XmlDeriverContext,
    target_namespace: &'ns str,
    pad: IndexedArtifacts,
}

impl DefinitionsWalk<'_, '_> {
    /// A derived artifact with a fresh identity in the document's namespace.
    fn create(&self, kind: ArtifactKind, name: &str) -> Artifact {
        Artifact::new(kind, name)
            .with_uuid(Uuid::new_v4())
            .with_namespace(self.target_namespace)
    }

    fn resolve(&self, node: Node<'_, '_>, symbolic: &str) -> QName {
        resolve_qname(node, self.target_namespace, symbolic)
    }

    fn push_all(&mut self, parent: Artifact, children: Vec<Artifact>) {
        self.pad.push(parent);
        for child in children {
            self.pad.push(child);
        }
    }

    fn schemas(&mut self, primary: &mut Artifact, root: Node<'_, '_>) -> Result<()> {
        for schema in self.context.query(root, "./wsdl:types/xsd:schema")? {
            record_schema_references(primary, schema, self.context)?;
            for declaration in derive_schema(schema, self.context)? {
                // Stamped before indexing so later phases can point at it
                self.pad.push(declaration.with_uuid(Uuid::new_v4()));
            }
        }
        debug!(declarations = self.pad.len(), "embedded schemas derived");
        Ok(())
    }

    fn messages(&mut self, root: Node<'_, '_>) -> Result<()> {
        for message_node in self.context.query(root, "./wsdl:message")? {
            let Some(name) = message_node.attribute("name") else {
                continue;
            };

            let mut parts = Vec::new();
            for part_node in self.context.query(message_node, "./wsdl:part")? {
                if let Some(part) = self.part(part_node) {
                    parts.push(part);
                }
            }

            let message = self
                .create(
                    ArtifactKind::Message {
                        parts: parts
                            .iter()
                            .filter_map(|p| child_target(p, TargetType::Part))
                            .collect(),
                    },
                    name,
                )
                .with_nc_name(name);
            self.push_all(message, parts);
        }
        debug!(artifacts = self.pad.len(), "messages derived");
        Ok(())
    }

    fn part(&self, node: Node<'_, '_>) -> Option<Artifact> {
        let name = node.attribute("name")?;

        let (element, xsd_type) = if let Some(symbolic) = node.attribute("element") {
            let qname = self.resolve(node, symbolic);
            let found = self.pad.lookup_element(&qname);
            (Some(local_reference(found, TargetType::Element, &qname)), None)
        } else if let Some(symbolic) = node.attribute("type") {
            let qname = self.resolve(node, symbolic);
            let found = self.pad.lookup_type(&qname);
            (None, Some(local_reference(found, TargetType::XsdType, &qname)))
        } else {
            (None, None)
        };

        Some(
            self.create(ArtifactKind::Part { element, xsd_type }, name)
                .with_nc_name(name),
        )
    }

    fn port_types(&mut self, root: Node<'_, '_>) -> Result<()> {
        for port_type_node in self.context.query(root, "./wsdl:portType")? {
            let Some(name) = port_type_node.attribute("name") else {
                continue;
            };

            let mut operations = Vec::new();
            let mut operation_children = Vec::new();
            for operation_node in self.context.query(port_type_node, "./wsdl:operation")? {
                if let Some((operation, io)) = self.operation(operation_node)? {
                    operations.push(operation);
                    operation_children.push(io);
                }
            }

            let port_type = self
                .create(
                    ArtifactKind::PortType {
                        operations: operations
                            .iter()
                            .filter_map(|o| child_target(o, TargetType::Operation))
                            .collect(),
                    },
                    name,
                )
                .with_nc_name(name);

            // Port type first: it moves the cursor its operations index under
            self.pad.push(port_type);
            for (operation, io) in operations.into_iter().zip(operation_children) {
                self.push_all(operation, io);
            }
        }
        debug!(artifacts = self.pad.len(), "port types derived");
        Ok(())
    }

    /// An operation and its input, output and fault artifacts.
    fn operation(&self, node: Node<'_, '_>) -> Result<Option<(Artifact, Vec<Artifact>)>> {
        let Some(name) = node.attribute("name") else {
            return Ok(None);
        };

        let input = self
            .context
            .query_first(node, "./wsdl:input")?
            .map(|n| self.operation_message(n, |message| ArtifactKind::OperationInput { message }));
        let output = self
            .context
            .query_first(node, "./wsdl:output")?
            .map(|n| {
                self.operation_message(n, |message| ArtifactKind::OperationOutput { message })
            });
        let faults: Vec<Artifact> = self
            .context
            .query(node, "./wsdl:fault")?
            .into_iter()
            .map(|n| self.operation_message(n, |message| ArtifactKind::Fault { message }))
            .collect();

        let operation = self
            .create(
                ArtifactKind::Operation {
                    input: input
                        .as_ref()
                        .and_then(|a| child_target(a, TargetType::OperationInput)),
                    output: output
                        .as_ref()
                        .and_then(|a| child_target(a, TargetType::OperationOutput)),
                    faults: faults
                        .iter()
                        .filter_map(|a| child_target(a, TargetType::Fault))
                        .collect(),
                },
                name,
            )
            .with_nc_name(name);

        let children = input.into_iter().chain(output).chain(faults).collect();
        Ok(Some((operation, children)))
    }

    /// Input, output or fault of a port type operation. Its name is the
    /// message's local part unless a `name` attribute overrides it.
    fn operation_message(
        &self,
        node: Node<'_, '_>,
        kind: impl FnOnce(Option<Target>) -> ArtifactKind,
    ) -> Artifact {
        let mut name = String::new();
        let message = node.attribute("message").map(|symbolic| {
            let qname = self.resolve(node, symbolic);
            name = qname.local_name().to_string();
            local_reference(self.pad.lookup_message(&qname), TargetType::Message, &qname)
        });

        let explicit = node.attribute("name");
        if let Some(explicit) = explicit {
            name = explicit.to_string();
        }

        let artifact = self.create(kind(message), &name);
        match explicit {
            Some(nc_name) => artifact.with_nc_name(nc_name),
            None => artifact,
        }
    }

    fn bindings(&mut self, root: Node<'_, '_>) -> Result<()> {
        for binding_node in self.context.query(root, "./wsdl:binding")? {
            let name = binding_node.attribute("name");

            let port_type_name = binding_node
                .attribute("type")
                .map(|symbolic| self.resolve(binding_node, symbolic));
            let port_type = port_type_name.as_ref().map(|qname| {
                local_reference(self.pad.lookup_port_type(qname), TargetType::PortType, qname)
            });

            let mut children = Vec::new();
            let mut binding_operations = Vec::new();
            for operation_node in self.context.query(binding_node, "./wsdl:operation")? {
                let Some(op_name) = operation_node.attribute("name") else {
                    continue;
                };
                let operation = port_type_name
                    .as_ref()
                    .map(|qname| self.binding_operation_target(qname, op_name));
                let (binding_operation, io) =
                    self.binding_operation(operation_node, op_name, operation)?;
                binding_operations.extend(child_target(
                    &binding_operation,
                    TargetType::BindingOperation,
                ));
                children.push(binding_operation);
                children.extend(io);
            }

            let mut extensions = Vec::new();
            for soap_node in self.context.query(binding_node, "./soap:binding")? {
                let soap_binding = self.extension(
                    soap_node,
                    ArtifactKind::SoapBinding {
                        style: soap_node.attribute("style").map(str::to_string),
                        transport: soap_node.attribute("transport").map(str::to_string),
                    },
                    SOAP_BINDING_NAME,
                );
                extensions.extend(child_target(&soap_binding, TargetType::WsdlExtension));
                children.push(soap_binding);
            }

            let binding = self.create(
                ArtifactKind::Binding {
                    port_type,
                    binding_operations,
                    extensions,
                },
                name.unwrap_or(DEFAULT_BINDING_NAME),
            );
            let binding = match name {
                Some(name) => binding.with_nc_name(name),
                None => binding,
            };
            self.push_all(binding, children);
        }
        debug!(artifacts = self.pad.len(), "bindings derived");
        Ok(())
    }

    /// Operation a binding operation implements. Only found locally when the
    /// binding's port type is in this document; the search itself goes
    /// through the scratchpad's current port type.
    fn binding_operation_target(&self, port_type: &QName, op_name: &str) -> Target {
        let operation = self
            .pad
            .lookup_port_type(port_type)
            .and_then(|_| self.pad.lookup_operation(op_name));
        let placeholder = QName::new(port_type.namespace(), op_name);
        local_reference(operation, TargetType::Operation, &placeholder)
    }

    fn binding_operation(
        &self,
        node: Node<'_, '_>,
        name: &str,
        operation: Option<Target>,
    ) -> Result<(Artifact, Vec<Artifact>)> {
        let input = self
            .context
            .query_first(node, "./wsdl:input")?
            .map(|n| {
                self.named_or_default(
                    n,
                    ArtifactKind::BindingOperationInput,
                    DEFAULT_BINDING_INPUT_NAME,
                )
            });
        let output = self
            .context
            .query_first(node, "./wsdl:output")?
            .map(|n| {
                self.named_or_default(
                    n,
                    ArtifactKind::BindingOperationOutput,
                    DEFAULT_BINDING_OUTPUT_NAME,
                )
            });
        let faults: Vec<Artifact> = self
            .context
            .query(node, "./wsdl:fault")?
            .into_iter()
            .map(|n| {
                self.named_or_default(
                    n,
                    ArtifactKind::BindingOperationFault,
                    DEFAULT_BINDING_FAULT_NAME,
                )
            })
            .collect();

        let binding_operation = self
            .create(
                ArtifactKind::BindingOperation {
                    operation,
                    input: input
                        .as_ref()
                        .and_then(|a| child_target(a, TargetType::BindingOperationInput)),
                    output: output
                        .as_ref()
                        .and_then(|a| child_target(a, TargetType::BindingOperationOutput)),
                    faults: faults
                        .iter()
                        .filter_map(|a| child_target(a, TargetType::BindingOperationFault))
                        .collect(),
                },
                name,
            )
            .with_nc_name(name);

        let children = input.into_iter().chain(output).chain(faults).collect();
        Ok((binding_operation, children))
    }

    fn named_or_default(&self, node: Node<'_, '_>, kind: ArtifactKind, default: &str) -> Artifact {
        match node.attribute("name") {
            Some(name) => self.create(kind, name).with_nc_name(name),
            None => self.create(kind, default),
        }
    }

    /// SOAP extension artifact. Namespace and NCName come from the extension
    /// element, not the document.
    fn extension(&self, node: Node<'_, '_>, kind: ArtifactKind, name: &str) -> Artifact {
        let tag = node.tag_name();
        let mut artifact = self.create(kind, name).with_nc_name(tag.name());
        artifact.namespace = tag.namespace().map(str::to_string);
        artifact
    }

    fn services(&mut self, root: Node<'_, '_>) -> Result<()> {
        for service_node in self.context.query(root, "./wsdl:service")? {
            let mut children = Vec::new();
            let mut ports = Vec::new();
            for port_node in self.context.query(service_node, "./wsdl:port")? {
                let (port, addresses) = self.port(port_node)?;
                ports.extend(child_target(&port, TargetType::Port));
                children.push(port);
                children.extend(addresses);
            }

            let service = self.named_or_default(
                service_node,
                ArtifactKind::WsdlService { ports },
                DEFAULT_SERVICE_NAME,
            );
            self.push_all(service, children);
        }
        debug!(artifacts = self.pad.len(), "services derived");
        Ok(())
    }

    fn port(&self, node: Node<'_, '_>) -> Result<(Artifact, Vec<Artifact>)> {
        let binding = node.attribute("binding").map(|symbolic| {
            let qname = self.resolve(node, symbolic);
            local_reference(self.pad.lookup_binding(&qname), TargetType::Binding, &qname)
        });

        let mut addresses = Vec::new();
        for address_node in self.context.query(node, "./soap:address")? {
            addresses.push(self.extension(
                address_node,
                ArtifactKind::SoapAddress {
                    soap_location: address_node.attribute("location").map(str::to_string),
                },
                SOAP_ADDRESS_NAME,
            ));
        }

        let port = self.named_or_default(
            node,
            ArtifactKind::Port {
                binding,
                extensions: addresses
                    .iter()
                    .filter_map(|a| child_target(a, TargetType::WsdlExtension))
                    .collect(),
            },
            DEFAULT_PORT_NAME,
        );
        Ok((port, addresses))
    }
}
