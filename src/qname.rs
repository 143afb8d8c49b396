//! Qualified names as used by schema and WSDL references.
//!
//! The textual form is `{namespace}local`, or the bare local part when the
//! namespace is empty. That text is what unresolved relationship targets carry
//! between the derive and link phases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `(namespace, local-name)` pair. An empty namespace means "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    namespace: String,
    local_name: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// A name in no namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new(String::new(), local_name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Decode the `{namespace}local` form produced by `Display`.
    ///
    /// Returns `None` for an opening brace without a matching close or an empty
    /// local part.
    pub fn parse_encoded(encoded: &str) -> Option<Self> {
        let qname = match encoded.strip_prefix('{') {
            Some(rest) => {
                let (namespace, local) = rest.split_once('}')?;
                Self::new(namespace, local)
            }
            None => Self::local(encoded),
        };

        if qname.local_name.is_empty() {
            None
        } else {
            Some(qname)
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}
