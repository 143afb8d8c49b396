//! Second-phase resolution of references that point outside a document.
//!
//! Every unresolved target is looked up through a [`LinkerContext`]. The first
//! match wins and resolves the target; no match removes the target from its
//! field or collection, so no unresolved target survives a link pass.

mod wsdl;
mod xsd;

use std::collections::BTreeMap;

use tracing::{trace, warn};
use uuid::Uuid;

pub use wsdl::WsdlLinker;
pub use xsd::XsdLinker;

use crate::artifact::{Artifact, ArtifactType, Target};
use crate::error::LinkResult;
use crate::qname::QName;

/// Exact-match criteria over indexed artifact properties.
pub type Criteria = BTreeMap<String, String>;

/// Read-only query capability over previously persisted artifacts.
pub trait LinkerContext {
    /// Artifacts of `model`/`artifact_type` whose properties equal every
    /// entry in `criteria`. An empty result is not an error.
    fn find_artifacts(
        &self,
        model: &str,
        artifact_type: &str,
        criteria: &Criteria,
    ) -> LinkResult<Vec<Artifact>>;
}

pub fn qname_criteria(name: &QName) -> Criteria {
    Criteria::from([
        ("namespace".to_string(), name.namespace().to_string()),
        ("ncName".to_string(), name.local_name().to_string()),
    ])
}

pub fn namespace_criteria(namespace: &str) -> Criteria {
    Criteria::from([("targetNamespace".to_string(), namespace.to_string())])
}

/// Identity of the first artifact `context` returns, skipping `exclude`.
fn first_match(
    context: &dyn LinkerContext,
    artifact_type: ArtifactType,
    criteria: &Criteria,
    exclude: Option<Uuid>,
) -> LinkResult<Option<Uuid>> {
    let found = context.find_artifacts(artifact_type.model(), artifact_type.type_name(), criteria)?;
    trace!(%artifact_type, ?criteria, matches = found.len(), "linker query");
    Ok(found
        .into_iter()
        .filter_map(|artifact| artifact.uuid)
        .find(|uuid| Some(*uuid) != exclude))
}

/// Look up an encoded `{namespace}local` reference, trying each artifact type
/// in turn. A malformed reference finds nothing.
pub(crate) fn find_by_qname(
    context: &dyn LinkerContext,
    candidates: &[ArtifactType],
    reference: &str,
) -> LinkResult<Option<Uuid>> {
    let Some(name) = QName::parse_encoded(reference) else {
        warn!(reference, "malformed unresolved reference");
        return Ok(None);
    };
    let criteria = qname_criteria(&name);
    for &artifact_type in candidates {
        if let Some(uuid) = first_match(context, artifact_type, &criteria, None)? {
            return Ok(Some(uuid));
        }
    }
    Ok(None)
}

/// Look up a document by target namespace. `exclude` keeps a document from
/// resolving a reference to itself, as an `xsd:include` of its own namespace would.
pub(crate) fn find_document(
    context: &dyn LinkerContext,
    artifact_type: ArtifactType,
    namespace: &str,
    exclude: Option<Uuid>,
) -> LinkResult<Option<Uuid>> {
    first_match(context, artifact_type, &namespace_criteria(namespace), exclude)
}

/// Resolve `slot` if it holds an unresolved target, clearing it when
/// `lookup` finds nothing.
pub(crate) fn resolve_slot<F>(slot: &mut Option<Target>, field: &str, lookup: F) -> LinkResult<()>
where
    F: FnOnce(&str) -> LinkResult<Option<Uuid>>,
{
    let Some(target) = slot else {
        return Ok(());
    };
    let Some(reference) = target.unresolved_ref() else {
        return Ok(());
    };

    match lookup(reference)? {
        Some(uuid) => {
            trace!(field, %uuid, "resolved");
            target.resolve(uuid);
        }
        None => {
            warn!(field, reference, "no match for reference, dropping target");
            *slot = None;
        }
    }
    Ok(())
}

/// Resolve every unresolved target in `targets`, removing the ones `lookup`
/// cannot find. Order of the survivors is kept.
pub(crate) fn resolve_all<F>(
    targets: &mut Vec<Target>,
    field: &str,
    mut lookup: F,
) -> LinkResult<()>
where
    F: FnMut(&str) -> LinkResult<Option<Uuid>>,
{
    let mut outcomes = Vec::with_capacity(targets.len());
    for target in targets.iter() {
        outcomes.push(match target.unresolved_ref() {
            Some(reference) => Some(lookup(reference)?),
            None => None,
        });
    }

    let mut outcomes = outcomes.into_iter();
    targets.retain_mut(|target| match outcomes.next().flatten() {
        None => true,
        Some(Some(uuid)) => {
            trace!(field, %uuid, "resolved");
            target.resolve(uuid);
            true
        }
        Some(None) => {
            warn!(
                field,
                reference = target.unresolved_ref().unwrap_or_default(),
                "no match for reference, dropping target"
            );
            false
        }
    });
    Ok(())
}
