//! Arrows the canvas should draw for the current store and view toggle.

use std::collections::HashSet;

use serde::Serialize;

use crate::{AnnotationStore, ConnectionKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrowFilter {
    /// Every connection in the document.
    All,
    /// Only connections touching this component.
    Selected(String),
}

/// How an arrow relates to what is being looked at; drives its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowRole {
    Output,
    Input,
    Inout,
}

impl ArrowRole {
    pub fn color(self) -> &'static str {
        match self {
            ArrowRole::Output => "#e06c75",
            ArrowRole::Input => "#98c379",
            ArrowRole::Inout => "#61afef",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arrow {
    pub source: String,
    pub target: String,
    pub bidirectional: bool,
    pub count: u32,
    pub role: ArrowRole,
}

impl Arrow {
    /// The store edit that deletes this arrow.
    pub fn kind(&self) -> ConnectionKind {
        if self.bidirectional {
            ConnectionKind::Inout
        } else {
            ConnectionKind::Output
        }
    }
}

/// One arrow per component pair, taken from `output` and `inout` lists in
/// document order; the first list that mentions a pair decides its shape.
/// Pairs with a missing endpoint are not drawn.
pub fn arrows(store: &AnnotationStore, filter: &ArrowFilter) -> Vec<Arrow> {
    let mut drawn: HashSet<(String, String)> = HashSet::new();
    let mut arrows = Vec::new();

    for (source, component) in store.components() {
        for kind in [ConnectionKind::Output, ConnectionKind::Inout] {
            for edge in component.connections.list(kind) {
                let target = edge.name.as_str();
                let pair = if source <= target {
                    (source.to_string(), target.to_string())
                } else {
                    (target.to_string(), source.to_string())
                };
                if drawn.contains(&pair) {
                    continue;
                }
                drawn.insert(pair);

                if !store.contains(target) {
                    continue;
                }

                let bidirectional = kind == ConnectionKind::Inout;
                let role = match filter {
                    ArrowFilter::All if bidirectional => ArrowRole::Inout,
                    ArrowFilter::All => ArrowRole::Output,
                    ArrowFilter::Selected(name) if name != source && name != target => continue,
                    ArrowFilter::Selected(_) if bidirectional => ArrowRole::Inout,
                    ArrowFilter::Selected(name) if name == source => ArrowRole::Output,
                    ArrowFilter::Selected(_) => ArrowRole::Input,
                };

                arrows.push(Arrow {
                    source: source.to_string(),
                    target: target.to_string(),
                    bidirectional,
                    count: edge.count,
                    role,
                });
            }
        }
    }

    arrows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundingBox;

    fn sample() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            let x = i as f64 * 20.0;
            store
                .add_component(*name, BoundingBox::new(x, 0.0, x + 10.0, 10.0))
                .unwrap();
        }
        store.add_connection("A", "B", ConnectionKind::Output);
        store.add_connection("A", "B", ConnectionKind::Output);
        store.add_connection("B", "C", ConnectionKind::Inout);
        store
    }

    #[test]
    fn all_view_draws_each_pair_once() {
        let arrows = arrows(&sample(), &ArrowFilter::All);
        assert_eq!(arrows.len(), 2);
        assert_eq!(arrows[0].source, "A");
        assert_eq!(arrows[0].target, "B");
        assert_eq!(arrows[0].count, 2);
        assert_eq!(arrows[0].role, ArrowRole::Output);
        assert!(arrows[1].bidirectional);
        assert_eq!(arrows[1].role, ArrowRole::Inout);
        assert_eq!(arrows[1].kind(), ConnectionKind::Inout);
    }

    #[test]
    fn selected_view_colors_incoming_as_input() {
        let arrows = arrows(&sample(), &ArrowFilter::Selected("B".to_string()));
        let roles: Vec<ArrowRole> = arrows.iter().map(|a| a.role).collect();
        assert_eq!(roles, vec![ArrowRole::Input, ArrowRole::Inout]);
        assert_eq!(ArrowRole::Input.color(), "#98c379");
    }

    #[test]
    fn selected_view_skips_unrelated_pairs() {
        let arrows = arrows(&sample(), &ArrowFilter::Selected("A".to_string()));
        assert_eq!(arrows.len(), 1);
        assert_eq!(arrows[0].role, ArrowRole::Output);
    }

    #[test]
    fn dangling_references_are_not_drawn() {
        let mut store = sample();
        store.update_connections_from_text("C", ConnectionKind::Output, "Nowhere");
        assert_eq!(arrows(&store, &ArrowFilter::All).len(), 2);
    }
}
