pub mod connection_text;
pub mod consistency;
mod error;
pub mod images;
pub mod session;
mod store;
pub mod view;

pub use error::{Result, StoreError};
pub use store::{AnnotationStore, ComponentDetails, SaveOutcome};

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// --- Geometry ---

/// Boxes narrower or shorter than this (in image pixels) are treated as stray clicks.
pub const MIN_BOX_SIZE: f64 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Component rectangle in image pixel coordinates.
///
/// Stored on disk as `[x_min, y_min, x_max, y_max]`. The numbers are kept
/// verbatim; nothing here reorders an inverted box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Normalize a rubber-band drag into a box, or `None` if the drag is too small.
    pub fn from_drag(start: Point, end: Point) -> Option<Self> {
        let bbox = Self::new(
            start.x.min(end.x),
            start.y.min(end.y),
            start.x.max(end.x),
            start.y.max(end.y),
        );
        (bbox.width() > MIN_BOX_SIZE && bbox.height() > MIN_BOX_SIZE).then_some(bbox)
    }

    pub fn width(&self) -> f64 {
        (self.x_max - self.x_min).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y_max - self.y_min).abs()
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Edges count as inside.
    pub fn contains(&self, point: Point) -> bool {
        let (left, right) = (self.x_min.min(self.x_max), self.x_min.max(self.x_max));
        let (top, bottom) = (self.y_min.min(self.y_max), self.y_min.max(self.y_max));
        point.x >= left && point.x <= right && point.y >= top && point.y <= bottom
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x_min, y_min, x_max, y_max]: [f64; 4]) -> Self {
        Self::new(x_min, y_min, x_max, y_max)
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        <[f64; 4]>::deserialize(deserializer).map(BoundingBox::from)
    }
}

impl JsonSchema for BoundingBox {
    fn inline_schema() -> bool {
        true
    }

    fn schema_name() -> Cow<'static, str> {
        "BoundingBox".into()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        <[f64; 4]>::json_schema(generator)
    }
}

// --- Types ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Input,
    Output,
    Inout,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 3] = [
        ConnectionKind::Input,
        ConnectionKind::Output,
        ConnectionKind::Inout,
    ];

    /// The list on the other endpoint that mirrors this one.
    pub fn reciprocal(self) -> Self {
        match self {
            ConnectionKind::Input => ConnectionKind::Output,
            ConnectionKind::Output => ConnectionKind::Input,
            ConnectionKind::Inout => ConnectionKind::Inout,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionKind::Input => "input",
            ConnectionKind::Output => "output",
            ConnectionKind::Inout => "inout",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" => Ok(ConnectionKind::Input),
            "output" => Ok(ConnectionKind::Output),
            "inout" => Ok(ConnectionKind::Inout),
            other => Err(format!("unknown connection kind: {other}")),
        }
    }
}

/// A pointer from one component's connection list to another component.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, JsonSchema)]
pub struct EdgeRef {
    pub name: String,
    /// Parallel wires of the same logical connection. Always at least 1.
    pub count: u32,
}

impl EdgeRef {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count: count.max(1),
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, 1)
    }

    /// Read one list entry. Older files store `{"name": ..}` without a count,
    /// hand-edited ones use a bare string or a float/string count. Anything
    /// without a name is `None`.
    pub fn from_value(value: &serde_json::Value) -> Option<EdgeRef> {
        match value {
            serde_json::Value::String(name) => Some(EdgeRef::single(name.as_str())),
            serde_json::Value::Object(map) => {
                let name = map.get("name")?.as_str()?;
                Some(EdgeRef::new(name, lenient_count(map.get("count"))))
            }
            _ => None,
        }
    }
}

/// Any count that is not a number or numeric string of at least 1 reads as 1.
fn lenient_count(value: Option<&serde_json::Value>) -> u32 {
    let count = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match count {
        Some(c) if c.is_finite() && c >= 1.0 => c.round().min(f64::from(u32::MAX)) as u32,
        _ => 1,
    }
}

impl<'de> Deserialize<'de> for EdgeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        EdgeRef::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("not a connection entry: {value}")))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Connections {
    #[serde(default)]
    pub input: Vec<EdgeRef>,
    #[serde(default)]
    pub output: Vec<EdgeRef>,
    #[serde(default)]
    pub inout: Vec<EdgeRef>,
}

impl Connections {
    pub fn list(&self, kind: ConnectionKind) -> &[EdgeRef] {
        match kind {
            ConnectionKind::Input => &self.input,
            ConnectionKind::Output => &self.output,
            ConnectionKind::Inout => &self.inout,
        }
    }

    pub fn list_mut(&mut self, kind: ConnectionKind) -> &mut Vec<EdgeRef> {
        match kind {
            ConnectionKind::Input => &mut self.input,
            ConnectionKind::Output => &mut self.output,
            ConnectionKind::Inout => &mut self.inout,
        }
    }

    pub fn find(&self, kind: ConnectionKind, name: &str) -> Option<&EdgeRef> {
        self.list(kind).iter().find(|e| e.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty() && self.inout.is_empty()
    }

    /// Read a `connections` object list by list. Entries that are not
    /// connection references are dropped with a warning; the rest are kept.
    pub fn from_value(value: Option<&serde_json::Value>, owner: &str) -> Connections {
        let mut connections = Connections::default();
        let Some(value) = value else {
            return connections;
        };
        let Some(map) = value.as_object() else {
            log::warn!("'{}': ignoring non-object connections {}", owner, value);
            return connections;
        };
        for kind in ConnectionKind::ALL {
            let Some(list) = map.get(kind.as_str()) else {
                continue;
            };
            let Some(items) = list.as_array() else {
                log::warn!("'{}': ignoring non-list {} connections {}", owner, kind, list);
                continue;
            };
            for item in items {
                match EdgeRef::from_value(item) {
                    Some(edge) => connections.list_mut(kind).push(edge),
                    None => log::warn!("'{}': ignoring {} entry {}", owner, kind, item),
                }
            }
        }
        connections
    }
}

/// A named rectangle on the diagram plus its port connection lists.
#[derive(Debug, Clone, Default, JsonSchema)]
pub struct Component {
    #[schemars(rename = "component_box")]
    pub bbox: BoundingBox,
    pub connections: Connections,
    /// Fields this version does not interpret (e.g. the legacy `type`), written back as read.
    #[schemars(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// `component_box` exactly as read; written back while `bbox` still matches it.
    #[schemars(skip)]
    raw_box: Option<serde_json::Value>,
}

const BOX_KEY: &str = "component_box";
const CONNECTIONS_KEY: &str = "connections";

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.bbox == other.bbox
            && self.connections == other.connections
            && self.extra == other.extra
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(2 + self.extra.len()))?;
        match self.unchanged_raw_box() {
            Some(raw) => map.serialize_entry(BOX_KEY, raw)?,
            None => map.serialize_entry(BOX_KEY, &self.bbox)?,
        }
        map.serialize_entry(CONNECTIONS_KEY, &self.connections)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = serde_json::Map::deserialize(deserializer)?;
        Ok(Component::from_map("component", map))
    }
}

impl Component {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            ..Default::default()
        }
    }

    /// Build a component from one file entry without rejecting anything.
    ///
    /// A box that is not four numbers leaves `bbox` at its default and is
    /// written back untouched; unknown keys go to `extra`.
    pub fn from_map(name: &str, mut map: serde_json::Map<String, serde_json::Value>) -> Self {
        let connections = Connections::from_value(map.get(CONNECTIONS_KEY), name);
        map.remove(CONNECTIONS_KEY);

        let raw_box = map.remove(BOX_KEY);
        let bbox = match raw_box.as_ref().map(|v| serde_json::from_value::<BoundingBox>(v.clone())) {
            Some(Ok(bbox)) => bbox,
            Some(Err(_)) => {
                log::warn!("'{}': unreadable component_box, keeping it as is", name);
                BoundingBox::default()
            }
            None => BoundingBox::default(),
        };

        Self {
            bbox,
            connections,
            extra: map,
            raw_box,
        }
    }

    fn unchanged_raw_box(&self) -> Option<&serde_json::Value> {
        let raw = self.raw_box.as_ref()?;
        let read_as = serde_json::from_value::<BoundingBox>(raw.clone()).unwrap_or_default();
        (read_as == self.bbox).then_some(raw)
    }

    /// Legacy free-form type label, if the file carried one.
    pub fn type_label(&self) -> Option<&str> {
        self.extra.get("type").and_then(|v| v.as_str())
    }

    pub fn references(&self, name: &str) -> bool {
        ConnectionKind::ALL
            .iter()
            .any(|kind| self.connections.find(*kind, name).is_some())
    }
}

pub type ComponentMap = IndexMap<String, Component>;

// --- Storage ---

pub const SKIPPED_STATUS: &str = "skipped";
const UNKNOWN_SKIP_REASON: &str = "Unknown";

/// What one annotation file holds: either components, or a marker saying the
/// image was deliberately left out.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Components(ComponentMap),
    Skipped { reason: String },
}

#[derive(Serialize)]
struct SkipMarker<'a> {
    status: &'a str,
    reason: &'a str,
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Document::Components(components) => components.serialize(serializer),
            Document::Skipped { reason } => SkipMarker {
                status: SKIPPED_STATUS,
                reason,
            }
            .serialize(serializer),
        }
    }
}

impl Document {
    /// Interpret a parsed JSON value. Returns `None` when the top level is not an object.
    ///
    /// Every object entry becomes a component, however odd its fields; only
    /// entries that are not objects are dropped, with a warning.
    pub fn from_value(value: serde_json::Value) -> Option<Document> {
        let serde_json::Value::Object(map) = value else {
            return None;
        };

        if map.get("status").and_then(|v| v.as_str()) == Some(SKIPPED_STATUS) {
            let reason = map
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or(UNKNOWN_SKIP_REASON)
                .to_string();
            return Some(Document::Skipped { reason });
        }

        let mut components = ComponentMap::with_capacity(map.len());
        for (name, entry) in map {
            match entry {
                serde_json::Value::Object(fields) => {
                    let component = Component::from_map(&name, fields);
                    components.insert(name, component);
                }
                other => log::warn!("skipping component '{}': not an object ({})", name, other),
            }
        }
        Some(Document::Components(components))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Read and parse one annotation file.
pub fn read_document(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| StoreError::json(path, e))?;
    Document::from_value(value).ok_or_else(|| StoreError::NotAnObject {
        path: path.to_path_buf(),
    })
}

/// Write one annotation file.
///
/// Writes a temp file next to the target and renames it over, so a failed
/// write never leaves a truncated annotation behind.
pub fn write_document(path: &Path, document: &Document) -> Result<()> {
    let json = document
        .to_json_pretty()
        .map_err(|e| StoreError::json(path, e))?;
    write_atomic(path, &json)
}

/// Delete an annotation file. Missing files are fine.
pub fn delete_document(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| StoreError::io(path, e))
    } else {
        Ok(())
    }
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "annotation.json".to_string());
    let tmp = dir.join(format!(".{}.tmp", file_name));
    fs::write(&tmp, data).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StoreError::io(path, e)
    })
}

/// JSON Schema of the component-mapping file shape.
pub fn document_schema() -> schemars::Schema {
    schemars::schema_for!(ComponentMap)
}

// --- Settings ---

pub const DEFAULT_SKIP_REASONS: [&str; 3] = [
    "Contains basic elements",
    "Parent/child diagram",
    "Series/parallel connection",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_folder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_folder: Option<PathBuf>,
    #[serde(default = "default_skip_reasons")]
    pub skip_reasons: Vec<String>,
}

fn default_skip_reasons() -> Vec<String> {
    DEFAULT_SKIP_REASONS.iter().map(|r| r.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_folder: None,
            json_folder: None,
            skip_reasons: default_skip_reasons(),
        }
    }
}

impl Settings {
    /// Returns false when the reason is blank or already listed.
    pub fn add_skip_reason(&mut self, reason: &str) -> bool {
        add_skip_reason(&mut self.skip_reasons, reason)
    }
}

pub(crate) fn add_skip_reason(reasons: &mut Vec<String>, reason: &str) -> bool {
    let reason = reason.trim();
    if reason.is_empty() || reasons.iter().any(|r| r == reason) {
        return false;
    }
    reasons.push(reason.to_string());
    true
}

/// Resolve the per-user directory (~/.annotator/).
pub fn annotator_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".annotator")
}

fn settings_path() -> PathBuf {
    annotator_dir().join("settings.json")
}

pub fn read_settings() -> Settings {
    read_settings_from(&settings_path())
}

pub fn read_settings_from(path: &Path) -> Settings {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn write_settings(settings: &Settings) -> Result<()> {
    write_settings_to(&settings_path(), settings)
}

pub fn write_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings).map_err(|e| StoreError::json(path, e))?;
    write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_drag_normalizes_corners() {
        let bbox = BoundingBox::from_drag(Point::new(30.0, 40.0), Point::new(10.0, 5.0)).unwrap();
        assert_eq!(bbox, BoundingBox::new(10.0, 5.0, 30.0, 40.0));
    }

    #[test]
    fn from_drag_rejects_tiny_boxes() {
        assert!(BoundingBox::from_drag(Point::new(0.0, 0.0), Point::new(5.0, 50.0)).is_none());
        assert!(BoundingBox::from_drag(Point::new(0.0, 0.0), Point::new(50.0, 3.0)).is_none());
        assert!(BoundingBox::from_drag(Point::new(0.0, 0.0), Point::new(6.0, 6.0)).is_some());
    }

    #[test]
    fn contains_is_inclusive_and_handles_inverted_boxes() {
        let bbox = BoundingBox::new(10.0, 10.0, 0.0, 0.0);
        assert!(bbox.contains(Point::new(0.0, 0.0)));
        assert!(bbox.contains(Point::new(10.0, 5.0)));
        assert!(!bbox.contains(Point::new(10.5, 5.0)));
    }

    #[test]
    fn edge_ref_defaults_missing_count() {
        let parsed: Vec<EdgeRef> =
            serde_json::from_value(json!([{"name": "A"}, "B", {"name": "C", "count": 0}, {"name": "D", "count": 4}]))
                .unwrap();
        assert_eq!(
            parsed,
            vec![
                EdgeRef::single("A"),
                EdgeRef::single("B"),
                EdgeRef::single("C"),
                EdgeRef::new("D", 4),
            ]
        );
    }

    #[test]
    fn component_keeps_unknown_fields() {
        let value = json!({
            "type": "amplifier",
            "component_box": [1, 2, 3, 4],
            "connections": {"output": [{"name": "B"}]},
            "note": {"checked": true}
        });
        let component: Component = serde_json::from_value(value).unwrap();
        assert_eq!(component.type_label(), Some("amplifier"));
        assert_eq!(component.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert!(component.connections.input.is_empty());

        let back = serde_json::to_value(&component).unwrap();
        assert_eq!(back["note"], json!({"checked": true}));
        assert_eq!(back["type"], json!("amplifier"));
        assert_eq!(back["connections"]["output"], json!([{"name": "B", "count": 1}]));
    }

    #[test]
    fn skip_marker_without_reason_is_unknown() {
        let doc = Document::from_value(json!({"status": "skipped"})).unwrap();
        assert_eq!(
            doc,
            Document::Skipped {
                reason: "Unknown".to_string()
            }
        );
    }

    #[test]
    fn skip_marker_serializes_status_first() {
        let doc = Document::Skipped {
            reason: "Parent/child diagram".to_string(),
        };
        let text = doc.to_json_pretty().unwrap();
        assert_eq!(
            text,
            "{\n  \"status\": \"skipped\",\n  \"reason\": \"Parent/child diagram\"\n}"
        );
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(Document::from_value(json!([1, 2, 3])).is_none());
        assert!(Document::from_value(json!("text")).is_none());
    }

    #[test]
    fn only_non_object_entries_are_dropped() {
        let doc = Document::from_value(json!({
            "Good": {"component_box": [0, 0, 1, 1]},
            "NoBox": {"component_box": null, "connections": {"output": ["Good"]}},
            "Short": {"component_box": [1, 2, 3]},
            "Bad": 42
        }))
        .unwrap();
        let Document::Components(components) = doc else {
            panic!("expected components");
        };
        assert_eq!(components.keys().collect::<Vec<_>>(), vec!["Good", "NoBox", "Short"]);
        assert_eq!(components["NoBox"].bbox, BoundingBox::default());
        assert_eq!(components["NoBox"].connections.output, vec![EdgeRef::single("Good")]);

        let back = serde_json::to_value(&components["Short"]).unwrap();
        assert_eq!(back["component_box"], json!([1, 2, 3]));
        let back = serde_json::to_value(&components["NoBox"]).unwrap();
        assert_eq!(back["component_box"], json!(null));
    }

    #[test]
    fn counts_are_read_leniently() {
        let component = Component::from_map(
            "A",
            json!({
                "component_box": [0, 0, 1, 1],
                "connections": {
                    "output": [
                        {"name": "B", "count": 2.0},
                        {"name": "C", "count": "3"},
                        {"name": "D", "count": -4},
                        {"name": "E", "count": null},
                        {"count": 5},
                        7
                    ],
                    "input": "nonsense"
                }
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        assert_eq!(
            component.connections.output,
            vec![
                EdgeRef::new("B", 2),
                EdgeRef::new("C", 3),
                EdgeRef::single("D"),
                EdgeRef::single("E"),
            ]
        );
        assert!(component.connections.input.is_empty());
    }

    #[test]
    fn box_is_written_as_read_until_changed() {
        let mut component: Component =
            serde_json::from_value(json!({"component_box": [50, 2, 80, 40.5]})).unwrap();
        let text = serde_json::to_string(&component).unwrap();
        assert!(text.starts_with(r#"{"component_box":[50,2,80,40.5]"#));

        component.bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let back = serde_json::to_value(&component).unwrap();
        assert_eq!(back["component_box"], json!([0.0, 0.0, 10.0, 10.0]));
    }

    #[test]
    fn connection_kind_parses_and_mirrors() {
        assert_eq!("Output".parse::<ConnectionKind>(), Ok(ConnectionKind::Output));
        assert!("sideways".parse::<ConnectionKind>().is_err());
        for kind in ConnectionKind::ALL {
            assert_eq!(kind.reciprocal().reciprocal(), kind);
        }
    }

    #[test]
    fn settings_round_trip_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        assert_eq!(read_settings_from(&path), Settings::default());

        let mut settings = Settings::default();
        assert!(settings.add_skip_reason("  Blurry scan "));
        assert!(!settings.add_skip_reason("Blurry scan"));
        assert!(!settings.add_skip_reason("   "));
        settings.json_folder = Some(PathBuf::from("/data/json"));
        write_settings_to(&path, &settings).unwrap();

        let loaded = read_settings_from(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.skip_reasons.last().map(String::as_str), Some("Blurry scan"));
    }

    #[test]
    fn schema_describes_component_box() {
        let schema = serde_json::to_string(&document_schema()).unwrap();
        assert!(schema.contains("component_box"));
        assert!(schema.contains("connections"));
    }
}
