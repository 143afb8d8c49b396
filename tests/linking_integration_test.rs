mod common;

use artifact_deriver::artifact::{Artifact, ArtifactKind, DocumentType, Target};
use artifact_deriver::deriver::{DerivedGraph, Deriver, WsdlDeriver, XsdDeriver};
use artifact_deriver::error::{DeriveError, LinkError};
use artifact_deriver::linker::Criteria;
use artifact_deriver::repository::InMemoryRepository;
use mockall::predicate::eq;

use common::*;

fn derive_remote_client() -> (Artifact, DerivedGraph) {
    let mut primary = Artifact::document(&DocumentType::WsdlDocument, "client.wsdl");
    let graph = WsdlDeriver::new()
        .derive(&mut primary, REMOTE_MESSAGE_WSDL.as_bytes())
        .unwrap();
    (primary, graph)
}

fn input_message(graph: &DerivedGraph) -> Option<&Target> {
    graph.iter().find_map(|a| match &a.kind {
        ArtifactKind::OperationInput { message } => message.as_ref(),
        _ => None,
    })
}

#[test]
fn test_link_replaces_sentinel_with_single_match() {
    let (mut primary, mut graph) = derive_remote_client();
    assert_eq!(graph.unresolved_count(), 1);

    let envelope = stored(ArtifactKind::Message { parts: vec![] }, "urn:shared", "Envelope");
    let envelope_uuid = envelope.uuid;

    let mut context = MockContext::new();
    context
        .expect_find_artifacts()
        .with(
            eq("wsdl"),
            eq("Message"),
            eq(Criteria::from([
                ("namespace".to_string(), "urn:shared".to_string()),
                ("ncName".to_string(), "Envelope".to_string()),
            ])),
        )
        .times(1)
        .returning(move |_, _, _| Ok(vec![envelope.clone()]));

    WsdlDeriver::new().link(&context, &mut primary, &mut graph).unwrap();

    let target = input_message(&graph).expect("message target kept");
    assert!(target.is_resolved());
    assert_eq!(target.value(), envelope_uuid);
    assert_eq!(target.unresolved_ref(), None);
    assert_eq!(graph.unresolved_count(), 0);
}

#[test]
fn test_second_link_is_a_no_op() {
    let (mut primary, mut graph) = derive_remote_client();
    let envelope = stored(ArtifactKind::Message { parts: vec![] }, "urn:shared", "Envelope");

    let mut first = MockContext::new();
    first
        .expect_find_artifacts()
        .times(1)
        .returning(move |_, _, _| Ok(vec![envelope.clone()]));
    WsdlDeriver::new().link(&first, &mut primary, &mut graph).unwrap();
    let linked = graph.clone();

    let mut second = MockContext::new();
    second.expect_find_artifacts().never();
    WsdlDeriver::new().link(&second, &mut primary, &mut graph).unwrap();

    assert_eq!(graph, linked);
}

#[test]
fn test_first_of_several_matches_wins() {
    let (mut primary, mut graph) = derive_remote_client();
    let first = stored(ArtifactKind::Message { parts: vec![] }, "urn:shared", "Envelope");
    let second = stored(ArtifactKind::Message { parts: vec![] }, "urn:shared", "Envelope");
    let expected = first.uuid;

    let context = RecordingContext::new(vec![first, second]);
    WsdlDeriver::new().link(&context, &mut primary, &mut graph).unwrap();

    assert_eq!(input_message(&graph).and_then(|t| t.value()), expected);
}

#[test]
fn test_unmatched_reference_is_removed() {
    let (mut primary, mut graph) = derive_remote_client();

    let context = RecordingContext::new(Vec::new());
    WsdlDeriver::new().link(&context, &mut primary, &mut graph).unwrap();

    assert!(input_message(&graph).is_none());
    assert_eq!(graph.unresolved_count(), 0);
    assert_eq!(context.queries().len(), 1);
}

#[test]
fn test_context_failure_propagates() {
    let (mut primary, mut graph) = derive_remote_client();

    let mut context = MockContext::new();
    context.expect_find_artifacts().returning(|model, artifact_type, _| {
        Err(LinkError::Query {
            model: model.to_string(),
            artifact_type: artifact_type.to_string(),
            details: "store offline".to_string(),
        })
    });

    let err = WsdlDeriver::new()
        .link(&context, &mut primary, &mut graph)
        .unwrap_err();
    assert!(matches!(err, DeriveError::Link(LinkError::Query { .. })));
}

#[test]
fn test_round_trip_through_repository() {
    let repository = InMemoryRepository::new();

    let mut schema = Artifact::document(&DocumentType::XsdDocument, "shared.xsd");
    let mut schema_graph = XsdDeriver::new()
        .derive(&mut schema, SHARED_XSD.as_bytes())
        .unwrap();
    repository.persist_graph(&mut schema, &mut schema_graph);
    let envelope_uuid = find(schema_graph.artifacts(), "Envelope").uuid;

    let mut client = Artifact::document(&DocumentType::WsdlDocument, "client.wsdl");
    let deriver = WsdlDeriver::new();
    let mut graph = deriver.derive(&mut client, SHARED_CLIENT_WSDL.as_bytes()).unwrap();
    assert_eq!(graph.unresolved_count(), 2);
    repository.persist_graph(&mut client, &mut graph);

    deriver.link(&repository, &mut client, &mut graph).unwrap();
    repository.update_graph(&client, &graph).unwrap();

    let envelope_part = find(graph.artifacts(), "envelope");
    let ArtifactKind::Part { element: Some(target), .. } = &envelope_part.kind else {
        panic!("envelope part lost its element");
    };
    assert_eq!(target.value(), envelope_uuid);

    let ghost = find(graph.artifacts(), "ghost");
    assert!(matches!(ghost.kind, ArtifactKind::Part { element: None, xsd_type: None }));
    assert_eq!(graph.unresolved_count(), 0);

    let persisted = repository.get(&ghost.uuid.unwrap()).unwrap();
    assert_eq!(persisted.unresolved_count(), 0);
    assert!(matches!(persisted.kind, ArtifactKind::Part { element: None, .. }));
}

#[test]
fn test_schema_imports_resolve_by_target_namespace() {
    let repository = InMemoryRepository::new();

    let mut shared = Artifact::document(&DocumentType::XsdDocument, "shared.xsd");
    let mut shared_graph = XsdDeriver::new()
        .derive(&mut shared, SHARED_XSD.as_bytes())
        .unwrap();
    repository.persist_graph(&mut shared, &mut shared_graph);

    let mut app = Artifact::document(&DocumentType::XsdDocument, "app.xsd");
    let deriver = XsdDeriver::new();
    let mut graph = deriver.derive(&mut app, IMPORTING_XSD.as_bytes()).unwrap();
    assert_eq!(app.unresolved_count(), 2);
    repository.persist_graph(&mut app, &mut graph);

    deriver.link(&repository, &mut app, &mut graph).unwrap();

    let ArtifactKind::XsdDocument { references, .. } = &app.kind else {
        panic!("not an xsd document");
    };
    assert_eq!(references.imported_xsds.len(), 1);
    assert_eq!(references.imported_xsds[0].value(), shared.uuid);
    assert_eq!(app.unresolved_count(), 0);
}
