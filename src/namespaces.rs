//! XML namespace handling
//!
//! Reading needs a scoped prefix -> URI lookup while walking the document.
//! Writing needs the opposite: a stable URI -> prefix assignment that is
//! declared once on the root element.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// XML namespace, bound to the `xml` prefix everywhere
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name as read from a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (None for no namespace or an undeclared prefix)
    pub namespace: Option<NamespaceUri>,
    /// Prefix as written in the document
    pub prefix: Option<Prefix>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            prefix: None,
            local_name: local_name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, Default)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        let mut ctx = Self::default();
        ctx.add_prefix("xml", XML_NAMESPACE);
        ctx
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace; an empty URI undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Resolve an element name. Unprefixed names take the default namespace.
    ///
    /// Returns `None` in the namespace slot when the prefix is undeclared;
    /// ADT responses are not always careful about that and the engine
    /// matches on local names anyway.
    pub fn resolve_element(&self, prefixed_name: &str) -> QName {
        match prefixed_name.split_once(':') {
            Some((prefix, local)) => QName {
                namespace: self.get_namespace(prefix).map(str::to_string),
                prefix: Some(prefix.to_string()),
                local_name: local.to_string(),
            },
            None => QName {
                namespace: self.default_namespace.clone(),
                prefix: None,
                local_name: prefixed_name.to_string(),
            },
        }
    }

    /// Resolve an attribute name. Unprefixed attributes are in no namespace.
    pub fn resolve_attribute(&self, prefixed_name: &str) -> QName {
        match prefixed_name.split_once(':') {
            Some(_) => self.resolve_element(prefixed_name),
            None => QName::local(prefixed_name),
        }
    }
}

/// Assigns prefixes to the namespaces used while writing a document
#[derive(Debug, Clone, Default)]
pub struct PrefixAllocator {
    /// URI -> prefix, in first-use order; "" is the default namespace
    bindings: IndexMap<NamespaceUri, Prefix>,
    generated: usize,
    default_reserved: bool,
}

impl PrefixAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the default namespace unbound, for documents whose root element
    /// is in no namespace
    pub fn reserve_default(&mut self) {
        self.default_reserved = true;
    }

    /// Prefix to use for `uri`, binding it on first use.
    ///
    /// The preferred prefix wins unless another namespace already took it;
    /// namespaces without a preferred prefix become the default namespace
    /// if that is still free, otherwise get `ns1`, `ns2`, ...
    pub fn prefix_for(&mut self, uri: &str, preferred: Option<&str>) -> Option<String> {
        if let Some(prefix) = self.bindings.get(uri) {
            return non_empty(prefix);
        }

        let taken = |p: &str, bindings: &IndexMap<NamespaceUri, Prefix>| {
            bindings.values().any(|existing| existing == p)
        };

        let prefix = match preferred {
            Some(p) if !p.is_empty() && p != "xml" && !taken(p, &self.bindings) => p.to_string(),
            None if !self.default_reserved && !taken("", &self.bindings) => String::new(),
            _ => loop {
                self.generated += 1;
                let candidate = format!("ns{}", self.generated);
                if !taken(&candidate, &self.bindings) {
                    break candidate;
                }
            },
        };

        self.bindings.insert(uri.to_string(), prefix.clone());
        non_empty(&prefix)
    }

    /// `xmlns` attributes for every bound namespace, in binding order
    pub fn declarations(&self) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .map(|(uri, prefix)| {
                let attr = if prefix.is_empty() {
                    "xmlns".to_string()
                } else {
                    format!("xmlns:{}", prefix)
                };
                (attr, uri.clone())
            })
            .collect()
    }

    /// True when nothing has been bound yet
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn non_empty(prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}
