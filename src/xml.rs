//! XML parsing context shared by the XML-based derivers.
//!
//! Documents are parsed non-validating; external DTDs and grammars are never
//! fetched. Queries use a small path language over a per-deriver prefix table:
//! `./a:b/c:d` selects children step by step, `.//a:b` selects descendants and
//! `*` matches any element.

use std::collections::{BTreeMap, HashSet};

use roxmltree::{Document, Node, ParsingOptions};
use tracing::trace;

use crate::error::{DeriveError, Result};
use crate::qname::QName;

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";

/// Decode raw document bytes as UTF-8, dropping a leading byte-order mark.
pub fn decode(content: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(content)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Parse a namespace-aware document tree.
pub fn parse(text: &str) -> Result<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    Ok(Document::parse_with_options(text, options)?)
}

/// Mutable prefix → namespace table used to interpret query expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    mappings: BTreeMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.mappings.insert(prefix.into(), namespace.into());
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.mappings.get(prefix).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    namespace: Option<String>,
    /// `None` matches any local name
    local_name: Option<String>,
}

impl Step {
    fn matches(&self, node: &Node<'_, '_>) -> bool {
        if !node.is_element() {
            return false;
        }
        let tag = node.tag_name();
        if let Some(local) = &self.local_name
            && tag.name() != local.as_str()
        {
            return false;
        }
        match &self.namespace {
            Some(ns) => tag.namespace() == Some(ns.as_str()),
            None => self.local_name.is_none() || tag.namespace().is_none(),
        }
    }
}

/// Per-document parsing context: the prefix table used to evaluate queries.
#[derive(Debug, Clone, Default)]
pub struct XmlDeriverContext {
    namespaces: NamespaceContext,
}

impl XmlDeriverContext {
    pub fn new(namespaces: NamespaceContext) -> Self {
        Self { namespaces }
    }

    pub fn add_namespace_mapping(
        &mut self,
        prefix: impl Into<String>,
        namespace: impl Into<String>,
    ) {
        self.namespaces.add_mapping(prefix, namespace);
    }

    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// Evaluate `expression` relative to `context`, returning matching elements
    /// in document order. Non-element nodes are skipped, never reported.
    pub fn query<'a, 'input>(
        &self,
        context: Node<'a, 'input>,
        expression: &str,
    ) -> Result<Vec<Node<'a, 'input>>> {
        let steps = self.compile(expression)?;
        let mut current = vec![context];

        for step in &steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                let candidates: Box<dyn Iterator<Item = Node<'a, 'input>> + 'a> = match step.axis {
                    Axis::Child => Box::new(node.children()),
                    Axis::Descendant => Box::new(node.descendants().skip(1)),
                };
                for candidate in candidates {
                    if step.matches(&candidate) && seen.insert(candidate.id()) {
                        next.push(candidate);
                    }
                }
            }
            next.sort_by_key(|n| n.id().get_usize());
            current = next;
        }

        trace!(expression, matches = current.len(), "query evaluated");
        Ok(current)
    }

    /// First match of `expression`, if any.
    pub fn query_first<'a, 'input>(
        &self,
        context: Node<'a, 'input>,
        expression: &str,
    ) -> Result<Option<Node<'a, 'input>>> {
        Ok(self.query(context, expression)?.into_iter().next())
    }

    fn compile(&self, expression: &str) -> Result<Vec<Step>> {
        let invalid = |details: &str| DeriveError::Query {
            expression: expression.to_string(),
            details: details.to_string(),
        };

        let mut rest = expression
            .strip_prefix('.')
            .ok_or_else(|| invalid("expression must be relative and start with '.'"))?;
        let mut steps = Vec::new();

        while !rest.is_empty() {
            let (axis, after) = if let Some(after) = rest.strip_prefix("//") {
                (Axis::Descendant, after)
            } else if let Some(after) = rest.strip_prefix('/') {
                (Axis::Child, after)
            } else {
                return Err(invalid("expected '/' or '//' between steps"));
            };

            let end = after.find('/').unwrap_or(after.len());
            let (name_test, remainder) = after.split_at(end);
            steps.push(self.compile_step(axis, name_test, &invalid)?);
            rest = remainder;
        }

        if steps.is_empty() {
            return Err(invalid("expression has no steps"));
        }
        Ok(steps)
    }

    fn compile_step(
        &self,
        axis: Axis,
        name_test: &str,
        invalid: &dyn Fn(&str) -> DeriveError,
    ) -> Result<Step> {
        if name_test.is_empty() {
            return Err(invalid("empty step"));
        }
        if name_test == "*" {
            return Ok(Step {
                axis,
                namespace: None,
                local_name: None,
            });
        }

        match name_test.split_once(':') {
            Some((prefix, local)) => {
                if local.is_empty() || local.contains(':') {
                    return Err(invalid("malformed qualified name"));
                }
                let namespace = self
                    .namespaces
                    .namespace_uri(prefix)
                    .ok_or_else(|| invalid(&format!("unbound prefix '{}'", prefix)))?;
                Ok(Step {
                    axis,
                    namespace: Some(namespace.to_string()),
                    local_name: (local != "*").then(|| local.to_string()),
                })
            }
            None => Ok(Step {
                axis,
                namespace: None,
                local_name: Some(name_test.to_string()),
            }),
        }
    }
}

/// Resolve a symbolic QName attribute value in the scope of `context`.
///
/// Unprefixed names take `default_namespace`. Prefixed names are looked up in
/// the namespace declarations in scope at `context` (its own and its
/// ancestors'). An unbound prefix yields a QName with no namespace whose local
/// part is the whole symbolic text.
pub fn resolve_qname(context: Node<'_, '_>, default_namespace: &str, symbolic: &str) -> QName {
    match symbolic.split_once(':') {
        None => QName::new(default_namespace, symbolic),
        Some((prefix, local)) => {
            let namespace = context
                .namespaces()
                .find(|ns| ns.name() == Some(prefix))
                .map(|ns| ns.uri());
            match namespace {
                Some(uri) => QName::new(uri, local),
                None => {
                    trace!(prefix, symbolic, "unbound prefix");
                    QName::local(symbolic)
                }
            }
        }
    }
}
