//! In-memory artifact store.
//!
//! Holds every persisted artifact keyed by identity and answers linker
//! queries by exact property match. Insertion order is kept so that the
//! first-match rule of the linkers is deterministic.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactType};
use crate::deriver::DerivedGraph;
use crate::error::{LinkError, LinkResult};
use crate::linker::{Criteria, LinkerContext};

#[derive(Debug, Default)]
struct Store {
    order: Vec<Uuid>,
    by_id: HashMap<Uuid, Artifact>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `artifact`, assigning an identity if it has none. Persisting an
    /// identity that is already present replaces the stored copy.
    pub fn persist(&self, mut artifact: Artifact) -> Uuid {
        let uuid = *artifact.uuid.get_or_insert_with(Uuid::new_v4);
        let mut store = self.write();
        if store.by_id.insert(uuid, artifact).is_none() {
            store.order.push(uuid);
        }
        uuid
    }

    /// Store a primary document together with everything derived from it.
    /// Returns the number of artifacts written.
    pub fn persist_graph(&self, primary: &mut Artifact, graph: &mut DerivedGraph) -> usize {
        primary.uuid = Some(self.persist(primary.clone()));
        let mut written = 1;
        for artifact in graph.iter_mut() {
            artifact.uuid = Some(self.persist(artifact.clone()));
            written += 1;
        }
        trace!(primary = %primary.name, written, "graph persisted");
        written
    }

    /// Replace the stored copy of an already persisted artifact, typically
    /// after linking changed its relationships.
    pub fn update_relationships(&self, artifact: &Artifact) -> LinkResult<()> {
        let uuid = artifact.uuid.ok_or_else(|| LinkError::NotPersisted {
            uuid: "<none>".to_string(),
        })?;
        let mut store = self.write();
        match store.by_id.get_mut(&uuid) {
            Some(stored) => {
                *stored = artifact.clone();
                Ok(())
            }
            None => Err(LinkError::NotPersisted {
                uuid: uuid.to_string(),
            }),
        }
    }

    pub fn update_graph(&self, primary: &Artifact, graph: &DerivedGraph) -> LinkResult<()> {
        self.update_relationships(primary)?;
        for artifact in graph {
            self.update_relationships(artifact)?;
        }
        debug!(primary = %primary.name, artifacts = graph.len() + 1, "relationships updated");
        Ok(())
    }

    pub fn get(&self, uuid: &Uuid) -> Option<Artifact> {
        self.read().by_id.get(uuid).cloned()
    }

    /// Every stored artifact of `artifact_type`, in insertion order.
    pub fn by_type(&self, artifact_type: ArtifactType) -> Vec<Artifact> {
        let store = self.read();
        store
            .order
            .iter()
            .filter_map(|uuid| store.by_id.get(uuid))
            .filter(|artifact| artifact.artifact_type() == artifact_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock leaves the map itself intact, so the
    // poisoned guard is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LinkerContext for InMemoryRepository {
    fn find_artifacts(
        &self,
        model: &str,
        artifact_type: &str,
        criteria: &Criteria,
    ) -> LinkResult<Vec<Artifact>> {
        let store = self.read();
        Ok(store
            .order
            .iter()
            .filter_map(|uuid| store.by_id.get(uuid))
            .filter(|artifact| {
                artifact.model() == model && artifact.artifact_type().type_name() == artifact_type
            })
            .filter(|artifact| {
                criteria
                    .iter()
                    .all(|(key, value)| artifact.property(key).as_deref() == Some(value.as_str()))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKind, DocumentType, Target, TargetType};
    use crate::linker::qname_criteria;
    use crate::qname::QName;

    fn element(namespace: &str, name: &str) -> Artifact {
        Artifact::new(ArtifactKind::ElementDeclaration, name)
            .with_namespace(namespace)
            .with_nc_name(name)
    }

    #[test]
    fn test_persist_assigns_identity() {
        let repo = InMemoryRepository::new();
        let uuid = repo.persist(element("urn:x", "A"));
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.get(&uuid).and_then(|a| a.uuid), Some(uuid));

        // Same identity replaces rather than duplicates
        let again = repo.persist(element("urn:x", "B").with_uuid(uuid));
        assert_eq!(again, uuid);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.get(&uuid).map(|a| a.name), Some("B".to_string()));
    }

    #[test]
    fn test_find_artifacts_matches_type_model_and_criteria() {
        let repo = InMemoryRepository::new();
        let first = repo.persist(element("urn:x", "Req"));
        let second = repo.persist(element("urn:x", "Req"));
        repo.persist(element("urn:y", "Req"));
        repo.persist(
            Artifact::new(ArtifactKind::Message { parts: vec![] }, "Req")
                .with_namespace("urn:x")
                .with_nc_name("Req"),
        );

        let criteria = qname_criteria(&QName::new("urn:x", "Req"));
        let found = repo
            .find_artifacts("xsd", "ElementDeclaration", &criteria)
            .unwrap();
        let ids: Vec<_> = found.iter().filter_map(|a| a.uuid).collect();
        assert_eq!(ids, vec![first, second]);

        // Wrong model for the type finds nothing
        assert!(repo
            .find_artifacts("wsdl", "ElementDeclaration", &criteria)
            .unwrap()
            .is_empty());
        // Empty result is not an error
        assert!(repo
            .find_artifacts("wsdl", "Binding", &Criteria::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_persist_graph_and_update() {
        let repo = InMemoryRepository::new();
        let mut primary = Artifact::document(&DocumentType::WsdlDocument, "svc.wsdl");
        let mut graph = DerivedGraph::from(vec![Artifact::new(
            ArtifactKind::OperationInput {
                message: Some(Target::unresolved(TargetType::Message, "{urn:x}Req")),
            },
            "Req",
        )]);

        assert_eq!(repo.persist_graph(&mut primary, &mut graph), 2);
        let input_id = graph.artifacts()[0].uuid;
        assert!(input_id.is_some());
        assert_eq!(repo.by_type(ArtifactType::OperationInput).len(), 1);

        if let ArtifactKind::OperationInput { message } =
            &mut graph.iter_mut().next().unwrap().kind
        {
            *message = None;
        }
        repo.update_graph(&primary, &graph).unwrap();
        let stored = repo.get(&input_id.unwrap()).unwrap();
        assert_eq!(stored.unresolved_count(), 0);
    }

    #[test]
    fn test_update_requires_persisted_artifact() {
        let repo = InMemoryRepository::new();
        let never_stored = element("urn:x", "A").with_uuid(Uuid::new_v4());
        assert!(matches!(
            repo.update_relationships(&never_stored),
            Err(LinkError::NotPersisted { .. })
        ));
        assert!(matches!(
            repo.update_relationships(&element("urn:x", "A")),
            Err(LinkError::NotPersisted { .. })
        ));
    }

    #[test]
    fn test_target_namespace_criteria() {
        let repo = InMemoryRepository::new();
        let mut doc = Artifact::document(&DocumentType::XsdDocument, "a.xsd");
        doc.set_target_namespace(Some("urn:a".to_string()));
        let uuid = repo.persist(doc);

        let found = repo
            .find_artifacts(
                "xsd",
                "XsdDocument",
                &crate::linker::namespace_criteria("urn:a"),
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uuid, Some(uuid));
    }
}
