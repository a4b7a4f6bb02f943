//! Read-only reciprocity check, used to highlight broken connections.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::{AnnotationStore, ConnectionKind};

/// A reference on `source`'s `kind` list with no matching record on `target`,
/// or whose target component does not exist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Inconsistency {
    pub source: String,
    pub target: String,
    pub kind: ConnectionKind,
    pub missing_target: bool,
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing_target {
            write!(
                f,
                "{} {} -> {}: component '{}' does not exist",
                self.source, self.kind, self.target, self.target
            )
        } else {
            write!(
                f,
                "{} {} -> {}: no {} entry for '{}' on '{}'",
                self.source,
                self.kind,
                self.target,
                self.kind.reciprocal(),
                self.source,
                self.target
            )
        }
    }
}

impl AnnotationStore {
    /// Every reference that breaks reciprocity: `output` without the `input`
    /// mirror (and the reverse), one-sided `inout`, and dangling names.
    pub fn find_inconsistent_connections(&self) -> BTreeSet<Inconsistency> {
        let mut found = BTreeSet::new();
        for (source, component) in self.components() {
            for kind in ConnectionKind::ALL {
                for edge in component.connections.list(kind) {
                    let report = match self.component(&edge.name) {
                        None => Some(true),
                        Some(target) => target
                            .connections
                            .find(kind.reciprocal(), source)
                            .is_none()
                            .then_some(false),
                    };
                    if let Some(missing_target) = report {
                        found.insert(Inconsistency {
                            source: source.to_string(),
                            target: edge.name.clone(),
                            kind,
                            missing_target,
                        });
                    }
                }
            }
        }
        found
    }

    pub fn is_consistent(&self) -> bool {
        self.find_inconsistent_connections().is_empty()
    }
}
