//! The annotation graph of the image currently open.
//!
//! `output` and `inout` are authoritative. `input` mirrors `output`: for every
//! `A.output -> B` the store keeps `B.input -> A`. `inout` is kept symmetric.
//! All mirror upkeep happens in the helpers at the bottom of this file so no
//! caller has to remember it.

use std::path::Path;

use crate::connection_text::{format_connection_list, parse_connection_text};
use crate::images::natural_cmp;
use crate::{
    read_document, write_document, BoundingBox, Component, ComponentMap, ConnectionKind,
    Document, EdgeRef, Point, Result, StoreError,
};

/// Result of a save that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// No components and no skip reason; nothing was written.
    NothingToSave,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    components: ComponentMap,
    skipped_reason: Option<String>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: Document) -> Self {
        let mut store = Self::new();
        store.adopt(document);
        store
    }

    /// Forget everything. No I/O.
    pub fn clear(&mut self) {
        self.components.clear();
        self.skipped_reason = None;
    }

    fn adopt(&mut self, document: Document) {
        match document {
            Document::Components(components) => {
                self.components = components;
                self.skipped_reason = None;
            }
            Document::Skipped { reason } => {
                self.components.clear();
                self.skipped_reason = Some(reason);
            }
        }
    }

    /// The document a save would write, or `None` when there is nothing to save.
    /// A skip reason wins over any components still held in memory.
    pub fn to_document(&self) -> Option<Document> {
        if let Some(reason) = &self.skipped_reason {
            Some(Document::Skipped {
                reason: reason.clone(),
            })
        } else if !self.components.is_empty() {
            Some(Document::Components(self.components.clone()))
        } else {
            None
        }
    }

    // --- Persistence ---

    /// Replace the current state with the contents of `path`.
    ///
    /// A missing or unparsable file leaves the store empty and returns false;
    /// callers treat that as "no prior annotations".
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.clear();
        match read_document(path) {
            Ok(document) => {
                self.adopt(document);
                log::debug!(
                    "loaded {} component(s) from {}",
                    self.components.len(),
                    path.display()
                );
                true
            }
            Err(e) => {
                log::debug!("no annotations loaded: {}", e);
                false
            }
        }
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<SaveOutcome> {
        let path = path.as_ref();
        let Some(document) = self.to_document() else {
            log::debug!("nothing to save for {}", path.display());
            return Ok(SaveOutcome::NothingToSave);
        };
        write_document(path, &document)?;
        log::debug!("saved annotations to {}", path.display());
        Ok(SaveOutcome::Written)
    }

    /// Boolean form of [`save_to_path`](Self::save_to_path): false only when the write failed.
    pub fn save_to_path_ok(&self, path: impl AsRef<Path>) -> bool {
        match self.save_to_path(path) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("failed to save annotations: {}", e);
                false
            }
        }
    }

    // --- Queries ---

    pub fn components(&self) -> impl Iterator<Item = (&str, &Component)> {
        self.components.iter().map(|(name, c)| (name.as_str(), c))
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Names in natural order, as the component list shows them.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.keys().cloned().collect();
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    pub fn skipped_reason(&self) -> Option<&str> {
        self.skipped_reason.as_deref()
    }

    pub fn set_skipped(&mut self, reason: impl Into<String>) {
        self.skipped_reason = Some(reason.into());
    }

    pub fn clear_skipped(&mut self) {
        self.skipped_reason = None;
    }

    /// Multiplicity of `source -> target` in `source`'s list of `kind`, 0 if absent.
    pub fn connection_count(&self, source: &str, target: &str, kind: ConnectionKind) -> u32 {
        self.components
            .get(source)
            .and_then(|c| c.connections.find(kind, target))
            .map_or(0, |e| e.count)
    }

    /// First component (in insertion order) whose box contains `point`.
    pub fn find_component_at(&self, point: Point) -> Option<&str> {
        self.components
            .iter()
            .find(|(_, c)| c.bbox.contains(point))
            .map(|(name, _)| name.as_str())
    }

    /// Like [`find_component_at`](Self::find_component_at) but prefers the
    /// smallest box when several overlap, so nested parts stay clickable.
    pub fn find_smallest_component_at(&self, point: Point) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (name, component) in &self.components {
            if !component.bbox.contains(point) {
                continue;
            }
            let area = component.bbox.area();
            if best.map_or(true, |(_, a)| area < a) {
                best = Some((name.as_str(), area));
            }
        }
        best.map(|(name, _)| name)
    }

    pub fn details(&self, name: &str) -> Option<ComponentDetails> {
        let component = self.components.get(name)?;
        let describe = |kind| {
            let text = format_connection_list(component.connections.list(kind));
            if text.is_empty() {
                "None".to_string()
            } else {
                text
            }
        };
        Some(ComponentDetails {
            name: name.to_string(),
            type_label: component.type_label().map(str::to_string),
            bbox: component.bbox,
            inputs: describe(ConnectionKind::Input),
            outputs: describe(ConnectionKind::Output),
            inouts: describe(ConnectionKind::Inout),
        })
    }

    // --- Components ---

    /// Add a component with empty connection lists.
    pub fn add_component(&mut self, name: impl Into<String>, bbox: BoundingBox) -> Result<()> {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(StoreError::NameConflict(name));
        }
        self.components.insert(name, Component::new(bbox));
        Ok(())
    }

    /// Delete a component and every reference to it. Absent names are ignored.
    pub fn remove_component(&mut self, name: &str) {
        if self.components.shift_remove(name).is_none() {
            log::debug!("remove_component: '{}' not present", name);
            return;
        }
        for component in self.components.values_mut() {
            for kind in ConnectionKind::ALL {
                strip(component.connections.list_mut(kind), name);
            }
        }
    }

    /// Re-key a component and rewrite every reference to it. Keeps its position
    /// in insertion order.
    pub fn rename_component(&mut self, old_name: &str, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        if old_name == new_name {
            return Ok(());
        }
        if self.components.contains_key(&new_name) {
            return Err(StoreError::NameConflict(new_name));
        }
        let Some((index, _, component)) = self.components.shift_remove_full(old_name) else {
            log::debug!("rename_component: '{}' not present", old_name);
            return Ok(());
        };
        self.components.shift_insert(index, new_name.clone(), component);

        for component in self.components.values_mut() {
            for kind in ConnectionKind::ALL {
                for edge in component.connections.list_mut(kind).iter_mut() {
                    if edge.name == old_name {
                        edge.name = new_name.clone();
                    }
                }
            }
        }
        Ok(())
    }

    // --- Connections ---

    /// Record one more wire from `source` to `target`.
    ///
    /// `Input` is read from `source`'s side: an input from `target` is an
    /// output of `target` into `source`. Unknown endpoints are ignored, and so
    /// are self-loops: a component never connects to itself.
    pub fn add_connection(&mut self, source: &str, target: &str, kind: ConnectionKind) {
        let Some((source, target, kind)) = self.link(source, target, kind) else {
            return;
        };
        match kind {
            ConnectionKind::Inout => {
                increment(self.list_mut(&source, ConnectionKind::Inout), &target);
                increment(self.list_mut(&target, ConnectionKind::Inout), &source);
            }
            _ => {
                increment(self.list_mut(&source, ConnectionKind::Output), &target);
                ensure_present(self.list_mut(&target, ConnectionKind::Input), &source);
            }
        }
    }

    /// Undo one [`add_connection`](Self::add_connection): the count drops by
    /// one and the reference disappears when it reaches zero.
    ///
    /// The `input` mirror goes away together with the last output wire. For
    /// `inout`, both sides are decremented and, once either side is gone, the
    /// other is dropped too so the pair stays symmetric.
    pub fn remove_connection(&mut self, source: &str, target: &str, kind: ConnectionKind) {
        if source == target {
            self.strip_self_reference(source, kind);
            return;
        }
        let Some((source, target, kind)) = self.link(source, target, kind) else {
            return;
        };
        match kind {
            ConnectionKind::Inout => {
                let gone_here = decrement(self.list_mut(&source, ConnectionKind::Inout), &target);
                let gone_there = decrement(self.list_mut(&target, ConnectionKind::Inout), &source);
                if gone_here || gone_there {
                    strip(self.list_mut(&source, ConnectionKind::Inout), &target);
                    strip(self.list_mut(&target, ConnectionKind::Inout), &source);
                }
            }
            _ => {
                if decrement(self.list_mut(&source, ConnectionKind::Output), &target) {
                    strip(self.list_mut(&target, ConnectionKind::Input), &source);
                }
            }
        }
    }

    /// Replace `component`'s list of `kind` with the parsed free-text field.
    ///
    /// Mirrors of the previous targets are removed first, then every new
    /// target that exists gets a count-1 mirror if it lacks one. Targets that
    /// do not exist yet are kept in the list as typed.
    pub fn update_connections_from_text(&mut self, component: &str, kind: ConnectionKind, text: &str) {
        if !self.components.contains_key(component) {
            log::debug!("update_connections_from_text: '{}' not present", component);
            return;
        }
        let mut new_edges = parse_connection_text(text);
        new_edges.retain(|edge| {
            let own = edge.name == component;
            if own {
                log::debug!("'{}' cannot list itself as {}", component, kind);
            }
            !own
        });
        let mirror = kind.reciprocal();

        let old_edges = std::mem::take(self.list_mut(component, kind));
        for edge in &old_edges {
            if let Some(target) = self.components.get_mut(&edge.name) {
                strip(target.connections.list_mut(mirror), component);
            }
        }

        let targets: Vec<String> = new_edges.iter().map(|e| e.name.clone()).collect();
        *self.list_mut(component, kind) = new_edges;

        for name in targets {
            if let Some(target) = self.components.get_mut(&name) {
                ensure_present(target.connections.list_mut(mirror), component);
            }
        }
    }

    // Files written by hand can still carry a self-reference; deleting it
    // drops the entry and its mirror whatever the count.
    fn strip_self_reference(&mut self, name: &str, kind: ConnectionKind) {
        let Some(component) = self.components.get_mut(name) else {
            return;
        };
        strip(component.connections.list_mut(kind), name);
        strip(component.connections.list_mut(kind.reciprocal()), name);
    }

    /// Resolve an edit request to (source, target, Output|Inout), or `None` for a no-op.
    fn link(&self, source: &str, target: &str, kind: ConnectionKind) -> Option<(String, String, ConnectionKind)> {
        let (source, target, kind) = match kind {
            ConnectionKind::Input => (target, source, ConnectionKind::Output),
            other => (source, target, other),
        };
        if source == target {
            log::debug!("ignoring self connection on '{}'", source);
            return None;
        }
        if !self.components.contains_key(source) || !self.components.contains_key(target) {
            log::debug!("ignoring connection {} -> {}: endpoint missing", source, target);
            return None;
        }
        Some((source.to_string(), target.to_string(), kind))
    }

    // Only called for names checked by `link` or `update_connections_from_text`.
    fn list_mut(&mut self, name: &str, kind: ConnectionKind) -> &mut Vec<EdgeRef> {
        self.components
            .entry(name.to_string())
            .or_default()
            .connections
            .list_mut(kind)
    }
}

/// What the details panel shows for one component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDetails {
    pub name: String,
    pub type_label: Option<String>,
    pub bbox: BoundingBox,
    pub inputs: String,
    pub outputs: String,
    pub inouts: String,
}

fn increment(list: &mut Vec<EdgeRef>, name: &str) {
    match list.iter_mut().find(|e| e.name == name) {
        Some(edge) => edge.count = edge.count.saturating_add(1),
        None => list.push(EdgeRef::single(name)),
    }
}

/// Returns true when the reference is gone afterwards (it was at 1 or absent).
fn decrement(list: &mut Vec<EdgeRef>, name: &str) -> bool {
    match list.iter().position(|e| e.name == name) {
        Some(i) if list[i].count > 1 => {
            list[i].count -= 1;
            false
        }
        Some(i) => {
            list.remove(i);
            true
        }
        None => true,
    }
}

fn ensure_present(list: &mut Vec<EdgeRef>, name: &str) {
    if !list.iter().any(|e| e.name == name) {
        list.push(EdgeRef::single(name));
    }
}

fn strip(list: &mut Vec<EdgeRef>, name: &str) {
    list.retain(|e| e.name != name);
}
