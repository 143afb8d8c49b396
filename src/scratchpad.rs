//! Indexed working set for one document's derivation.
//!
//! Artifacts are appended in order and never removed. Appending an element
//! declaration, schema type, message, port type or binding also indexes it by
//! `(namespace, NCName)`; simple and complex types share one index. Operations
//! are indexed under the port type most recently appended, tracked by an
//! explicit cursor.

use std::collections::HashMap;

use crate::artifact::{Artifact, ArtifactType};
use crate::qname::QName;

#[derive(Debug, Default)]
pub struct IndexedArtifacts {
    artifacts: Vec<Artifact>,
    elements: HashMap<QName, usize>,
    schema_types: HashMap<QName, usize>,
    messages: HashMap<QName, usize>,
    port_types: HashMap<QName, usize>,
    bindings: HashMap<QName, usize>,
    operations: HashMap<(QName, String), usize>,
    current_port_type: Option<QName>,
}

impl IndexedArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an artifact, updating the indices. Returns its position.
    pub fn push(&mut self, artifact: Artifact) -> usize {
        let position = self.artifacts.len();
        let key = Self::key_of(&artifact);

        match artifact.artifact_type() {
            ArtifactType::ElementDeclaration => {
                self.elements.insert(key, position);
            }
            ArtifactType::SimpleTypeDeclaration | ArtifactType::ComplexTypeDeclaration => {
                self.schema_types.insert(key, position);
            }
            ArtifactType::Message => {
                self.messages.insert(key, position);
            }
            ArtifactType::PortType => {
                self.port_types.insert(key.clone(), position);
                self.current_port_type = Some(key);
            }
            ArtifactType::Operation => {
                if let Some(port_type) = &self.current_port_type {
                    let name = key.local_name().to_string();
                    self.operations.insert((port_type.clone(), name), position);
                }
            }
            ArtifactType::Binding => {
                self.bindings.insert(key, position);
            }
            _ => {}
        }

        self.artifacts.push(artifact);
        position
    }

    fn key_of(artifact: &Artifact) -> QName {
        QName::new(
            artifact.namespace.clone().unwrap_or_default(),
            artifact.nc_name.clone().unwrap_or_default(),
        )
    }

    fn lookup(&self, index: &HashMap<QName, usize>, name: &QName) -> Option<&Artifact> {
        index.get(name).and_then(|&i| self.artifacts.get(i))
    }

    pub fn lookup_element(&self, name: &QName) -> Option<&Artifact> {
        self.lookup(&self.elements, name)
    }

    /// Simple or complex type declared under `name`.
    pub fn lookup_type(&self, name: &QName) -> Option<&Artifact> {
        self.lookup(&self.schema_types, name)
    }

    pub fn lookup_message(&self, name: &QName) -> Option<&Artifact> {
        self.lookup(&self.messages, name)
    }

    pub fn lookup_port_type(&self, name: &QName) -> Option<&Artifact> {
        self.lookup(&self.port_types, name)
    }

    pub fn lookup_binding(&self, name: &QName) -> Option<&Artifact> {
        self.lookup(&self.bindings, name)
    }

    /// Operation named `name` under the current port type cursor.
    ///
    /// The cursor is whatever port type was appended last, not the port type a
    /// binding refers to. With several port types sharing an operation name,
    /// bindings resolve against the last port type's operation.
    pub fn lookup_operation(&self, name: &str) -> Option<&Artifact> {
        let port_type = self.current_port_type.clone()?;
        self.operations
            .get(&(port_type, name.to_string()))
            .and_then(|&i| self.artifacts.get(i))
    }

    pub fn current_port_type(&self) -> Option<&QName> {
        self.current_port_type.as_ref()
    }

    pub fn get(&self, position: usize) -> Option<&Artifact> {
        self.artifacts.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Artifact> {
        self.artifacts.get_mut(position)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }
}
