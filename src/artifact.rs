//! Artifact data model: primary documents, the artifacts derived from them and
//! the typed relationship targets that connect them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved attribute key marking a target whose resolution is deferred to the
/// link phase. The value is the `{namespace}local` form of the reference.
pub const UNRESOLVED_REF: &str = "{urn:s-ramp:wsdl-deriver}unresolvedRef";

/// Every artifact kind this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactType {
    XsdDocument,
    WsdlDocument,
    PolicyDocument,
    ExtendedDocument,
    ElementDeclaration,
    AttributeDeclaration,
    SimpleTypeDeclaration,
    ComplexTypeDeclaration,
    Message,
    Part,
    PortType,
    Operation,
    OperationInput,
    OperationOutput,
    Fault,
    Binding,
    BindingOperation,
    BindingOperationInput,
    BindingOperationOutput,
    BindingOperationFault,
    SoapBinding,
    SoapAddress,
    WsdlService,
    Port,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 24] = [
        ArtifactType::XsdDocument,
        ArtifactType::WsdlDocument,
        ArtifactType::PolicyDocument,
        ArtifactType::ExtendedDocument,
        ArtifactType::ElementDeclaration,
        ArtifactType::AttributeDeclaration,
        ArtifactType::SimpleTypeDeclaration,
        ArtifactType::ComplexTypeDeclaration,
        ArtifactType::Message,
        ArtifactType::Part,
        ArtifactType::PortType,
        ArtifactType::Operation,
        ArtifactType::OperationInput,
        ArtifactType::OperationOutput,
        ArtifactType::Fault,
        ArtifactType::Binding,
        ArtifactType::BindingOperation,
        ArtifactType::BindingOperationInput,
        ArtifactType::BindingOperationOutput,
        ArtifactType::BindingOperationFault,
        ArtifactType::SoapBinding,
        ArtifactType::SoapAddress,
        ArtifactType::WsdlService,
        ArtifactType::Port,
    ];

    /// Model name used when querying a `LinkerContext`.
    pub fn model(self) -> &'static str {
        use ArtifactType::*;
        match self {
            XsdDocument | ElementDeclaration | AttributeDeclaration | SimpleTypeDeclaration
            | ComplexTypeDeclaration => "xsd",
            PolicyDocument => "policy",
            ExtendedDocument => "ext",
            SoapBinding | SoapAddress => "soapWsdl",
            WsdlDocument | Message | Part | PortType | Operation | OperationInput
            | OperationOutput | Fault | Binding | BindingOperation | BindingOperationInput
            | BindingOperationOutput | BindingOperationFault | WsdlService | Port => "wsdl",
        }
    }

    pub fn type_name(self) -> &'static str {
        use ArtifactType::*;
        match self {
            XsdDocument => "XsdDocument",
            WsdlDocument => "WsdlDocument",
            PolicyDocument => "PolicyDocument",
            ExtendedDocument => "ExtendedDocument",
            ElementDeclaration => "ElementDeclaration",
            AttributeDeclaration => "AttributeDeclaration",
            SimpleTypeDeclaration => "SimpleTypeDeclaration",
            ComplexTypeDeclaration => "ComplexTypeDeclaration",
            Message => "Message",
            Part => "Part",
            PortType => "PortType",
            Operation => "Operation",
            OperationInput => "OperationInput",
            OperationOutput => "OperationOutput",
            Fault => "Fault",
            Binding => "Binding",
            BindingOperation => "BindingOperation",
            BindingOperationInput => "BindingOperationInput",
            BindingOperationOutput => "BindingOperationOutput",
            BindingOperationFault => "BindingOperationFault",
            SoapBinding => "SoapBinding",
            SoapAddress => "SoapAddress",
            WsdlService => "WsdlService",
            Port => "Port",
        }
    }

    /// Whether artifacts of this type are primary (uploaded) documents.
    pub fn is_document(self) -> bool {
        matches!(
            self,
            ArtifactType::XsdDocument
                | ArtifactType::WsdlDocument
                | ArtifactType::PolicyDocument
                | ArtifactType::ExtendedDocument
        )
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactType::ALL
            .iter()
            .copied()
            .find(|t| t.type_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown artifact type: {}", s))
    }
}

/// Type tag of a primary document, which selects its deriver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    XsdDocument,
    WsdlDocument,
    PolicyDocument,
    /// Any document type outside the built-in set, keyed by its type name
    Extended(String),
}

impl DocumentType {
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            DocumentType::XsdDocument => ArtifactType::XsdDocument,
            DocumentType::WsdlDocument => ArtifactType::WsdlDocument,
            DocumentType::PolicyDocument => ArtifactType::PolicyDocument,
            DocumentType::Extended(_) => ArtifactType::ExtendedDocument,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, DocumentType::Extended(_))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Extended(name) => f.write_str(name),
            other => f.write_str(other.artifact_type().type_name()),
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err("Document type name cannot be empty".to_string()),
            "XsdDocument" => Ok(DocumentType::XsdDocument),
            "WsdlDocument" => Ok(DocumentType::WsdlDocument),
            "PolicyDocument" => Ok(DocumentType::PolicyDocument),
            other => Ok(DocumentType::Extended(other.to_string())),
        }
    }
}

/// What a relationship target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// Back-reference from a derived artifact to the document it came from
    RelatedDocument(ArtifactType),
    XsdDocument,
    WsdlDocument,
    Element,
    /// Simple or complex schema type
    XsdType,
    Message,
    Part,
    PortType,
    Operation,
    OperationInput,
    OperationOutput,
    Fault,
    Binding,
    BindingOperation,
    BindingOperationInput,
    BindingOperationOutput,
    BindingOperationFault,
    WsdlExtension,
    Port,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetState {
    Resolved(Uuid),
    Unresolved(String),
}

/// Value of a relationship field: either resolved to an artifact identity or
/// unresolved and carrying the symbolic reference under [`UNRESOLVED_REF`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "TargetRepr", try_from = "TargetRepr")]
pub struct Target {
    target_type: TargetType,
    state: TargetState,
    other_attributes: BTreeMap<String, String>,
}

impl Target {
    pub fn resolved(target_type: TargetType, value: Uuid) -> Self {
        Self {
            target_type,
            state: TargetState::Resolved(value),
            other_attributes: BTreeMap::new(),
        }
    }

    pub fn unresolved(target_type: TargetType, reference: impl fmt::Display) -> Self {
        Self {
            target_type,
            state: TargetState::Unresolved(reference.to_string()),
            other_attributes: BTreeMap::new(),
        }
    }

    /// Attach a pass-through attribute. The reserved sentinel key is ignored.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != UNRESOLVED_REF {
            self.other_attributes.insert(key, value.into());
        }
        self
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn value(&self) -> Option<Uuid> {
        match self.state {
            TargetState::Resolved(uuid) => Some(uuid),
            TargetState::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, TargetState::Resolved(_))
    }

    /// The encoded symbolic reference while the target is unresolved.
    pub fn unresolved_ref(&self) -> Option<&str> {
        match &self.state {
            TargetState::Unresolved(reference) => Some(reference),
            TargetState::Resolved(_) => None,
        }
    }

    /// Point the target at `value`, dropping the sentinel.
    pub fn resolve(&mut self, value: Uuid) {
        self.state = TargetState::Resolved(value);
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.other_attributes
    }
}

/// Wire form of a [`Target`], with the sentinel stored among the attributes.
#[derive(Serialize, Deserialize)]
struct TargetRepr {
    target_type: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Uuid>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    other_attributes: BTreeMap<String, String>,
}

impl From<Target> for TargetRepr {
    fn from(target: Target) -> Self {
        let mut other_attributes = target.other_attributes;
        let value = match target.state {
            TargetState::Resolved(uuid) => Some(uuid),
            TargetState::Unresolved(reference) => {
                other_attributes.insert(UNRESOLVED_REF.to_string(), reference);
                None
            }
        };
        Self {
            target_type: target.target_type,
            value,
            other_attributes,
        }
    }
}

impl TryFrom<TargetRepr> for Target {
    type Error = String;

    fn try_from(mut repr: TargetRepr) -> Result<Self, Self::Error> {
        let sentinel = repr.other_attributes.remove(UNRESOLVED_REF);
        let state = match (repr.value, sentinel) {
            (Some(uuid), None) => TargetState::Resolved(uuid),
            (None, Some(reference)) => TargetState::Unresolved(reference),
            (Some(_), Some(_)) => {
                return Err("target is both resolved and unresolved".to_string());
            }
            (None, None) => return Err("target has neither a value nor a reference".to_string()),
        };
        Ok(Self {
            target_type: repr.target_type,
            state,
            other_attributes: repr.other_attributes,
        })
    }
}

/// Document references found in schema bodies (`xsd:import`, `xsd:include`, `xsd:redefine`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReferences {
    pub imported_xsds: Vec<Target>,
    pub included_xsds: Vec<Target>,
    pub redefined_xsds: Vec<Target>,
}

/// Variant-specific payload of an artifact, including its relationship fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "artifactType")]
pub enum ArtifactKind {
    XsdDocument {
        target_namespace: Option<String>,
        #[serde(flatten)]
        references: SchemaReferences,
    },
    WsdlDocument {
        target_namespace: Option<String>,
        #[serde(flatten)]
        references: SchemaReferences,
        imported_wsdls: Vec<Target>,
    },
    PolicyDocument,
    ExtendedDocument {
        extended_type: String,
    },
    ElementDeclaration,
    AttributeDeclaration,
    SimpleTypeDeclaration,
    ComplexTypeDeclaration,
    Message {
        parts: Vec<Target>,
    },
    Part {
        element: Option<Target>,
        xsd_type: Option<Target>,
    },
    PortType {
        operations: Vec<Target>,
    },
    Operation {
        input: Option<Target>,
        output: Option<Target>,
        faults: Vec<Target>,
    },
    OperationInput {
        message: Option<Target>,
    },
    OperationOutput {
        message: Option<Target>,
    },
    Fault {
        message: Option<Target>,
    },
    Binding {
        port_type: Option<Target>,
        binding_operations: Vec<Target>,
        extensions: Vec<Target>,
    },
    BindingOperation {
        operation: Option<Target>,
        input: Option<Target>,
        output: Option<Target>,
        faults: Vec<Target>,
    },
    BindingOperationInput,
    BindingOperationOutput,
    BindingOperationFault,
    SoapBinding {
        style: Option<String>,
        transport: Option<String>,
    },
    SoapAddress {
        soap_location: Option<String>,
    },
    WsdlService {
        ports: Vec<Target>,
    },
    Port {
        binding: Option<Target>,
        extensions: Vec<Target>,
    },
}

impl ArtifactKind {
    /// Empty payload for a primary document of the given type.
    pub fn document(document_type: &DocumentType) -> Self {
        match document_type {
            DocumentType::XsdDocument => ArtifactKind::XsdDocument {
                target_namespace: None,
                references: SchemaReferences::default(),
            },
            DocumentType::WsdlDocument => ArtifactKind::WsdlDocument {
                target_namespace: None,
                references: SchemaReferences::default(),
                imported_wsdls: Vec::new(),
            },
            DocumentType::PolicyDocument => ArtifactKind::PolicyDocument,
            DocumentType::Extended(name) => ArtifactKind::ExtendedDocument {
                extended_type: name.clone(),
            },
        }
    }

    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            ArtifactKind::XsdDocument { .. } => ArtifactType::XsdDocument,
            ArtifactKind::WsdlDocument { .. } => ArtifactType::WsdlDocument,
            ArtifactKind::PolicyDocument => ArtifactType::PolicyDocument,
            ArtifactKind::ExtendedDocument { .. } => ArtifactType::ExtendedDocument,
            ArtifactKind::ElementDeclaration => ArtifactType::ElementDeclaration,
            ArtifactKind::AttributeDeclaration => ArtifactType::AttributeDeclaration,
            ArtifactKind::SimpleTypeDeclaration => ArtifactType::SimpleTypeDeclaration,
            ArtifactKind::ComplexTypeDeclaration => ArtifactType::ComplexTypeDeclaration,
            ArtifactKind::Message { .. } => ArtifactType::Message,
            ArtifactKind::Part { .. } => ArtifactType::Part,
            ArtifactKind::PortType { .. } => ArtifactType::PortType,
            ArtifactKind::Operation { .. } => ArtifactType::Operation,
            ArtifactKind::OperationInput { .. } => ArtifactType::OperationInput,
            ArtifactKind::OperationOutput { .. } => ArtifactType::OperationOutput,
            ArtifactKind::Fault { .. } => ArtifactType::Fault,
            ArtifactKind::Binding { .. } => ArtifactType::Binding,
            ArtifactKind::BindingOperation { .. } => ArtifactType::BindingOperation,
            ArtifactKind::BindingOperationInput => ArtifactType::BindingOperationInput,
            ArtifactKind::BindingOperationOutput => ArtifactType::BindingOperationOutput,
            ArtifactKind::BindingOperationFault => ArtifactType::BindingOperationFault,
            ArtifactKind::SoapBinding { .. } => ArtifactType::SoapBinding,
            ArtifactKind::SoapAddress { .. } => ArtifactType::SoapAddress,
            ArtifactKind::WsdlService { .. } => ArtifactType::WsdlService,
            ArtifactKind::Port { .. } => ArtifactType::Port,
        }
    }
}

/// A named relationship field and one of its targets.
#[derive(Debug, Clone, Copy)]
pub struct Relationship<'a> {
    pub name: &'static str,
    pub target: &'a Target,
}

/// A typed metadata record: a primary document or a piece derived from one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub uuid: Option<Uuid>,
    pub name: String,
    pub namespace: Option<String>,
    pub nc_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_document: Option<Target>,
    #[serde(flatten)]
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, name: impl Into<String>) -> Self {
        Self {
            uuid: None,
            name: name.into(),
            namespace: None,
            nc_name: None,
            related_document: None,
            kind,
        }
    }

    /// A primary document artifact with a fresh identity.
    pub fn document(document_type: &DocumentType, name: impl Into<String>) -> Self {
        Self::new(ArtifactKind::document(document_type), name).with_uuid(Uuid::new_v4())
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_nc_name(mut self, nc_name: impl Into<String>) -> Self {
        self.nc_name = Some(nc_name.into());
        self
    }

    pub fn artifact_type(&self) -> ArtifactType {
        self.kind.artifact_type()
    }

    pub fn model(&self) -> &'static str {
        self.artifact_type().model()
    }

    pub fn target_namespace(&self) -> Option<&str> {
        match &self.kind {
            ArtifactKind::XsdDocument {
                target_namespace, ..
            }
            | ArtifactKind::WsdlDocument {
                target_namespace, ..
            } => target_namespace.as_deref(),
            _ => None,
        }
    }

    /// Record the target namespace on an XSD or WSDL document. Other kinds ignore it.
    pub fn set_target_namespace(&mut self, namespace: Option<String>) {
        if let ArtifactKind::XsdDocument {
            target_namespace, ..
        }
        | ArtifactKind::WsdlDocument {
            target_namespace, ..
        } = &mut self.kind
        {
            *target_namespace = namespace;
        }
    }

    pub fn schema_references_mut(&mut self) -> Option<&mut SchemaReferences> {
        match &mut self.kind {
            ArtifactKind::XsdDocument { references, .. }
            | ArtifactKind::WsdlDocument { references, .. } => Some(references),
            _ => None,
        }
    }

    /// Document type tag, for primary artifacts only.
    pub fn document_type(&self) -> Option<DocumentType> {
        match &self.kind {
            ArtifactKind::XsdDocument { .. } => Some(DocumentType::XsdDocument),
            ArtifactKind::WsdlDocument { .. } => Some(DocumentType::WsdlDocument),
            ArtifactKind::PolicyDocument => Some(DocumentType::PolicyDocument),
            ArtifactKind::ExtendedDocument { extended_type } => {
                Some(DocumentType::Extended(extended_type.clone()))
            }
            _ => None,
        }
    }

    /// Indexed property lookup used by criteria matching.
    pub fn property(&self, key: &str) -> Option<String> {
        match key {
            "uuid" => self.uuid.map(|u| u.to_string()),
            "name" => Some(self.name.clone()),
            "namespace" => self.namespace.clone(),
            "ncName" => self.nc_name.clone(),
            "targetNamespace" => self.target_namespace().map(str::to_string),
            "artifactType" => Some(self.artifact_type().type_name().to_string()),
            "model" => Some(self.model().to_string()),
            _ => None,
        }
    }

    /// All relationship targets, including the related-document back-reference.
    pub fn relationships(&self) -> Vec<Relationship<'_>> {
        fn one<'a>(
            rels: &mut Vec<Relationship<'a>>,
            name: &'static str,
            target: &'a Option<Target>,
        ) {
            if let Some(target) = target {
                rels.push(Relationship { name, target });
            }
        }
        fn many<'a>(rels: &mut Vec<Relationship<'a>>, name: &'static str, targets: &'a [Target]) {
            rels.extend(targets.iter().map(|target| Relationship { name, target }));
        }
        fn schema_refs<'a>(rels: &mut Vec<Relationship<'a>>, refs: &'a SchemaReferences) {
            many(rels, "importedXsds", &refs.imported_xsds);
            many(rels, "includedXsds", &refs.included_xsds);
            many(rels, "redefinedXsds", &refs.redefined_xsds);
        }

        let mut rels = Vec::new();
        one(&mut rels, "relatedDocument", &self.related_document);

        match &self.kind {
            ArtifactKind::XsdDocument { references, .. } => schema_refs(&mut rels, references),
            ArtifactKind::WsdlDocument {
                references,
                imported_wsdls,
                ..
            } => {
                schema_refs(&mut rels, references);
                many(&mut rels, "importedWsdls", imported_wsdls);
            }
            ArtifactKind::Message { parts } => many(&mut rels, "part", parts),
            ArtifactKind::Part { element, xsd_type } => {
                one(&mut rels, "element", element);
                one(&mut rels, "type", xsd_type);
            }
            ArtifactKind::PortType { operations } => many(&mut rels, "operation", operations),
            ArtifactKind::Operation {
                input,
                output,
                faults,
            } => {
                one(&mut rels, "input", input);
                one(&mut rels, "output", output);
                many(&mut rels, "fault", faults);
            }
            ArtifactKind::OperationInput { message }
            | ArtifactKind::OperationOutput { message }
            | ArtifactKind::Fault { message } => one(&mut rels, "message", message),
            ArtifactKind::Binding {
                port_type,
                binding_operations,
                extensions,
            } => {
                one(&mut rels, "portType", port_type);
                many(&mut rels, "bindingOperation", binding_operations);
                many(&mut rels, "extension", extensions);
            }
            ArtifactKind::BindingOperation {
                operation,
                input,
                output,
                faults,
            } => {
                one(&mut rels, "operation", operation);
                one(&mut rels, "input", input);
                one(&mut rels, "output", output);
                many(&mut rels, "fault", faults);
            }
            ArtifactKind::WsdlService { ports } => many(&mut rels, "port", ports),
            ArtifactKind::Port {
                binding,
                extensions,
            } => {
                one(&mut rels, "binding", binding);
                many(&mut rels, "extension", extensions);
            }
            ArtifactKind::PolicyDocument
            | ArtifactKind::ExtendedDocument { .. }
            | ArtifactKind::ElementDeclaration
            | ArtifactKind::AttributeDeclaration
            | ArtifactKind::SimpleTypeDeclaration
            | ArtifactKind::ComplexTypeDeclaration
            | ArtifactKind::BindingOperationInput
            | ArtifactKind::BindingOperationOutput
            | ArtifactKind::BindingOperationFault
            | ArtifactKind::SoapBinding { .. }
            | ArtifactKind::SoapAddress { .. } => {}
        }

        rels
    }

    /// Number of relationship targets still carrying the unresolved sentinel.
    pub fn unresolved_count(&self) -> usize {
        self.relationships()
            .iter()
            .filter(|rel| !rel.target.is_resolved())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_type_models() {
        assert_eq!(ArtifactType::XsdDocument.model(), "xsd");
        assert_eq!(ArtifactType::ComplexTypeDeclaration.model(), "xsd");
        assert_eq!(ArtifactType::Message.model(), "wsdl");
        assert_eq!(ArtifactType::SoapAddress.model(), "soapWsdl");
        assert_eq!(ArtifactType::PolicyDocument.model(), "policy");
        assert_eq!(ArtifactType::ExtendedDocument.model(), "ext");
    }

    #[test]
    fn test_artifact_type_from_str() {
        assert_eq!(
            "BindingOperationFault".parse::<ArtifactType>(),
            Ok(ArtifactType::BindingOperationFault)
        );
        assert_eq!("message".parse::<ArtifactType>(), Ok(ArtifactType::Message));
        assert!("Nonsense".parse::<ArtifactType>().is_err());

        for t in ArtifactType::ALL {
            assert_eq!(t.type_name().parse::<ArtifactType>(), Ok(t));
        }
    }

    #[test]
    fn test_document_type_parsing() {
        assert_eq!(
            "WsdlDocument".parse::<DocumentType>(),
            Ok(DocumentType::WsdlDocument)
        );
        assert_eq!(
            "SwitchYardXmlDocument".parse::<DocumentType>(),
            Ok(DocumentType::Extended("SwitchYardXmlDocument".to_string()))
        );
        assert!("  ".parse::<DocumentType>().is_err());
        assert!(DocumentType::PolicyDocument.is_builtin());
        assert_eq!(
            DocumentType::Extended("X".into()).artifact_type(),
            ArtifactType::ExtendedDocument
        );
    }

    #[test]
    fn test_target_states_are_exclusive() {
        let uuid = Uuid::new_v4();
        let resolved = Target::resolved(TargetType::Message, uuid);
        assert!(resolved.is_resolved());
        assert_eq!(resolved.value(), Some(uuid));
        assert_eq!(resolved.unresolved_ref(), None);

        let mut unresolved = Target::unresolved(TargetType::Message, "{urn:x}Req");
        assert!(!unresolved.is_resolved());
        assert_eq!(unresolved.value(), None);
        assert_eq!(unresolved.unresolved_ref(), Some("{urn:x}Req"));

        unresolved.resolve(uuid);
        assert_eq!(unresolved.value(), Some(uuid));
        assert_eq!(unresolved.unresolved_ref(), None);
    }

    #[test]
    fn test_target_attributes_never_hold_sentinel() {
        let target = Target::resolved(TargetType::Binding, Uuid::new_v4())
            .with_attribute("wsdl:required", "true")
            .with_attribute(UNRESOLVED_REF, "{urn:x}Sneaky");

        assert!(target.is_resolved());
        assert_eq!(target.attributes().len(), 1);
        assert!(!target.attributes().contains_key(UNRESOLVED_REF));
    }

    #[test]
    fn test_target_wire_form_carries_sentinel() {
        let target = Target::unresolved(TargetType::PortType, "{urn:x}PT")
            .with_attribute("wsdl:required", "true");
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["other_attributes"][UNRESOLVED_REF], "{urn:x}PT");
        assert_eq!(json["other_attributes"]["wsdl:required"], "true");
        assert!(json.get("value").is_none());

        let mut back: Target = serde_json::from_value(json).unwrap();
        assert_eq!(back, target);
        assert_eq!(back.attributes().len(), 1);

        // Resolving drops the sentinel but keeps pass-through attributes
        let uuid = Uuid::new_v4();
        back.resolve(uuid);
        let json = serde_json::to_value(&back).unwrap();
        assert_eq!(json["value"], uuid.to_string());
        assert!(json["other_attributes"].get(UNRESOLVED_REF).is_none());
        assert_eq!(json["other_attributes"]["wsdl:required"], "true");
    }

    #[test]
    fn test_target_wire_form_rejects_both_states() {
        let json = serde_json::json!({
            "target_type": "Message",
            "value": Uuid::new_v4(),
            "other_attributes": { (UNRESOLVED_REF): "{urn:x}Req" }
        });
        assert!(serde_json::from_value::<Target>(json).is_err());
    }

    #[test]
    fn test_relationships_and_unresolved_count() {
        let artifact = Artifact::new(
            ArtifactKind::BindingOperation {
                operation: Some(Target::unresolved(TargetType::Operation, "{urn:x}op")),
                input: Some(Target::resolved(
                    TargetType::BindingOperationInput,
                    Uuid::new_v4(),
                )),
                output: None,
                faults: vec![Target::resolved(
                    TargetType::BindingOperationFault,
                    Uuid::new_v4(),
                )],
            },
            "op",
        );

        let names: Vec<_> = artifact.relationships().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["operation", "input", "fault"]);
        assert_eq!(artifact.unresolved_count(), 1);
    }

    #[test]
    fn test_document_artifact() {
        let doc = Artifact::document(&DocumentType::WsdlDocument, "service.wsdl");
        assert!(doc.uuid.is_some());
        assert_eq!(doc.artifact_type(), ArtifactType::WsdlDocument);
        assert_eq!(doc.document_type(), Some(DocumentType::WsdlDocument));
        assert_eq!(doc.target_namespace(), None);

        let ext = Artifact::document(&DocumentType::Extended("WebXml".into()), "web.xml");
        assert_eq!(ext.property("artifactType").as_deref(), Some("ExtendedDocument"));
        assert_eq!(
            ext.document_type(),
            Some(DocumentType::Extended("WebXml".into()))
        );
    }

    #[test]
    fn test_property_lookup() {
        let artifact = Artifact::new(ArtifactKind::ElementDeclaration, "ReqElem")
            .with_namespace("urn:x")
            .with_nc_name("ReqElem");

        assert_eq!(artifact.property("namespace").as_deref(), Some("urn:x"));
        assert_eq!(artifact.property("ncName").as_deref(), Some("ReqElem"));
        assert_eq!(artifact.property("model").as_deref(), Some("xsd"));
        assert_eq!(artifact.property("uuid"), None);
        assert_eq!(artifact.property("unknown"), None);
    }
}
