use std::path::{Path, PathBuf};

use annotator_core::images::{self, annotation_path, base_name};
use annotator_core::{
    delete_document, document_schema, read_document, AnnotationStore, BoundingBox,
    ConnectionKind, Point, SaveOutcome, Settings,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;

const INSTRUCTIONS: &str = "\
Edits block-diagram annotation files: one JSON file per diagram image, mapping component names \
to a bounding box and input/output/inout connection lists.

- Identify a diagram by its image name, with or without extension (\"page_01.png\" or \"page_01\").
- `output` is the authoritative direction. Adding an output from A to B also records A on B's \
input list. Use kind \"input\" to record a connection seen from the receiving side.
- Repeated add_connection calls on the same pair count parallel wires.
- Skipped images hold no components; call unskip_image before editing one.
- Run check_consistency after hand edits to find one-sided references.";

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ImageRequest {
    /// Image file name, e.g. "page_01.png". The extension is optional.
    image: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AddComponentRequest {
    /// Image file name
    image: String,
    /// Unique component name within this image
    name: String,
    /// Bounding box in image pixels: [x_min, y_min, x_max, y_max]. Corners may be given in either order.
    #[serde(rename = "box")]
    bbox: [f64; 4],
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ComponentRequest {
    /// Image file name
    image: String,
    /// Component name
    name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct RenameComponentRequest {
    /// Image file name
    image: String,
    /// Current component name
    old_name: String,
    /// New component name. Every reference to the component is rewritten.
    new_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ConnectionRequest {
    /// Image file name
    image: String,
    /// Component the connection is read from
    source: String,
    /// Component on the other end
    target: String,
    /// "output" (source drives target), "input" (target drives source) or "inout" (bidirectional)
    kind: ConnectionKind,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetConnectionsRequest {
    /// Image file name
    image: String,
    /// Component whose list is replaced
    component: String,
    /// Which list to replace: "input", "output" or "inout"
    kind: ConnectionKind,
    /// Comma-separated names with optional counts, e.g. "B*3, C". Empty clears the list.
    text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SkipImageRequest {
    /// Image file name
    image: String,
    /// Why the image is left out, e.g. "Contains basic elements"
    reason: String,
}

// --- Store access ---

/// Load the annotations at `path`. A missing file is an empty store; an
/// unreadable one is an error so it never gets overwritten.
fn load_store(path: &Path) -> Result<AnnotationStore, String> {
    if !path.exists() {
        return Ok(AnnotationStore::new());
    }
    read_document(path)
        .map(AnnotationStore::from_document)
        .map_err(|e| format!("Failed to read annotations: {}", e))
}

/// Persist `store`; an empty store removes the file.
fn commit(store: &AnnotationStore, path: &Path) -> Result<(), String> {
    match store.save_to_path(path) {
        Ok(SaveOutcome::Written) => Ok(()),
        Ok(SaveOutcome::NothingToSave) => {
            delete_document(path).map_err(|e| format!("Failed to remove empty annotation file: {}", e))
        }
        Err(e) => Err(format!("Failed to save annotations: {}", e)),
    }
}

fn require_component(store: &AnnotationStore, name: &str) -> Result<(), String> {
    if store.contains(name) {
        Ok(())
    } else {
        Err(format!("Component '{}' not found", name))
    }
}

fn respond(result: Result<String, String>) -> Result<CallToolResult, McpError> {
    Ok(match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(e)]),
    })
}

/// First CLI argument, else the configured JSON folder, else `cwd`.
fn resolve_json_dir(arg: Option<String>, settings: &Settings, cwd: PathBuf) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| settings.json_folder.clone())
        .unwrap_or(cwd)
}

// --- Server ---

#[derive(Clone)]
pub struct AnnotatorServer {
    json_dir: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl AnnotatorServer {
    fn path_for(&self, image: &str) -> PathBuf {
        annotation_path(&self.json_dir, image)
    }

    /// Load, apply `f`, save. Skipped images are read-only until unskipped.
    fn edit<F>(&self, image: &str, f: F) -> Result<String, String>
    where
        F: FnOnce(&mut AnnotationStore) -> Result<String, String>,
    {
        let path = self.path_for(image);
        let mut store = load_store(&path)?;
        if let Some(reason) = store.skipped_reason() {
            return Err(format!(
                "Image '{}' is skipped ({}). Call unskip_image first.",
                base_name(image),
                reason
            ));
        }
        let message = f(&mut store)?;
        commit(&store, &path)?;
        log::info!("{}: {}", path.display(), message);
        Ok(message)
    }
}

#[tool_router]
impl AnnotatorServer {
    pub fn new(json_dir: PathBuf) -> Self {
        Self {
            json_dir,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List the images that have an annotation file, in natural order")]
    fn list_annotations(&self) -> Result<CallToolResult, McpError> {
        respond(
            images::list_annotations(&self.json_dir)
                .map(|names| {
                    if names.is_empty() {
                        format!("No annotation files in {}", self.json_dir.display())
                    } else {
                        names.join("\n")
                    }
                })
                .map_err(|e| e.to_string()),
        )
    }

    #[tool(
        description = "Get the annotation file of one image as pretty JSON: {name: {component_box: [x_min, y_min, x_max, y_max], connections: {input: [{name, count}], output: [...], inout: [...]}}}, or {status: \"skipped\", reason} for skipped images."
    )]
    fn get_annotation(
        &self,
        Parameters(req): Parameters<ImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = load_store(&self.path_for(&req.image)).and_then(|store| match store.to_document() {
            Some(document) => document
                .to_json_pretty()
                .map_err(|e| format!("Serialization error: {}", e)),
            None => Ok(format!("No annotations for '{}'", base_name(&req.image))),
        });
        respond(result)
    }

    #[tool(description = "Add a component with an empty connection list. Fails if the name is taken or the box is smaller than 5 pixels on a side.")]
    fn add_component(
        &self,
        Parameters(req): Parameters<AddComponentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let [x1, y1, x2, y2] = req.bbox;
        let Some(bbox) = BoundingBox::from_drag(Point::new(x1, y1), Point::new(x2, y2)) else {
            return respond(Err(format!("Box {:?} is too small", req.bbox)));
        };
        respond(self.edit(&req.image, |store| {
            store.add_component(req.name.clone(), bbox).map_err(|e| e.to_string())?;
            Ok(format!("Added component '{}'", req.name))
        }))
    }

    #[tool(description = "Delete a component and every reference to it from other components")]
    fn remove_component(
        &self,
        Parameters(req): Parameters<ComponentRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.edit(&req.image, |store| {
            require_component(store, &req.name)?;
            store.remove_component(&req.name);
            Ok(format!("Removed component '{}'", req.name))
        }))
    }

    #[tool(description = "Rename a component and rewrite every reference to it")]
    fn rename_component(
        &self,
        Parameters(req): Parameters<RenameComponentRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.edit(&req.image, |store| {
            require_component(store, &req.old_name)?;
            store
                .rename_component(&req.old_name, req.new_name.clone())
                .map_err(|e| e.to_string())?;
            Ok(format!("Renamed '{}' to '{}'", req.old_name, req.new_name))
        }))
    }

    #[tool(description = "Record one more wire between two existing components. Repeating the call on the same pair raises its count.")]
    fn add_connection(
        &self,
        Parameters(req): Parameters<ConnectionRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.edit(&req.image, |store| {
            require_component(store, &req.source)?;
            require_component(store, &req.target)?;
            if req.source == req.target {
                return Err("A component cannot connect to itself".to_string());
            }
            store.add_connection(&req.source, &req.target, req.kind);
            let (from, to) = match req.kind {
                ConnectionKind::Input => (&req.target, &req.source),
                _ => (&req.source, &req.target),
            };
            let kind = if req.kind == ConnectionKind::Inout {
                ConnectionKind::Inout
            } else {
                ConnectionKind::Output
            };
            Ok(format!(
                "{} {} -> {} (count {})",
                from,
                kind,
                to,
                store.connection_count(from, to, kind)
            ))
        }))
    }

    #[tool(description = "Remove one wire between two components. The reference disappears when its count reaches zero.")]
    fn remove_connection(
        &self,
        Parameters(req): Parameters<ConnectionRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.edit(&req.image, |store| {
            require_component(store, &req.source)?;
            require_component(store, &req.target)?;
            store.remove_connection(&req.source, &req.target, req.kind);
            Ok(format!(
                "Removed one {} connection between '{}' and '{}'",
                req.kind, req.source, req.target
            ))
        }))
    }

    #[tool(
        description = "Replace one connection list of a component from text such as \"B*3, C\" (name with optional *count, comma separated). Mirrors on the other components are updated; names that do not exist yet are kept as typed."
    )]
    fn set_connections(
        &self,
        Parameters(req): Parameters<SetConnectionsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.edit(&req.image, |store| {
            require_component(store, &req.component)?;
            store.update_connections_from_text(&req.component, req.kind, &req.text);
            let details = store
                .details(&req.component)
                .ok_or_else(|| format!("Component '{}' not found", req.component))?;
            let list = match req.kind {
                ConnectionKind::Input => details.inputs,
                ConnectionKind::Output => details.outputs,
                ConnectionKind::Inout => details.inouts,
            };
            Ok(format!("{} {}: {}", req.component, req.kind, list))
        }))
    }

    #[tool(description = "Mark an image as skipped. Its components are discarded and the file only records the reason.")]
    fn skip_image(
        &self,
        Parameters(req): Parameters<SkipImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let reason = req.reason.trim();
        if reason.is_empty() {
            return respond(Err("Skip reason must not be empty".to_string()));
        }
        let path = self.path_for(&req.image);
        let mut store = AnnotationStore::new();
        store.set_skipped(reason);
        respond(
            commit(&store, &path)
                .map(|_| format!("Skipped '{}': {}", base_name(&req.image), reason)),
        )
    }

    #[tool(description = "Remove the skip marker of an image so it can be annotated again")]
    fn unskip_image(
        &self,
        Parameters(req): Parameters<ImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let path = self.path_for(&req.image);
        let result = load_store(&path).and_then(|mut store| {
            if store.skipped_reason().is_none() {
                return Ok(format!("'{}' is not skipped", base_name(&req.image)));
            }
            store.clear_skipped();
            commit(&store, &path)?;
            Ok(format!("Unskipped '{}'", base_name(&req.image)))
        });
        respond(result)
    }

    #[tool(description = "List connection references without their reciprocal entry, or that point at missing components")]
    fn check_consistency(
        &self,
        Parameters(req): Parameters<ImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = load_store(&self.path_for(&req.image)).map(|store| {
            let issues = store.find_inconsistent_connections();
            if issues.is_empty() {
                "consistent".to_string()
            } else {
                issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        });
        respond(result)
    }

    #[tool(description = "Get the JSON Schema of an annotation file")]
    fn get_schema(&self) -> Result<CallToolResult, McpError> {
        respond(
            serde_json::to_string_pretty(&document_schema())
                .map_err(|e| format!("Serialization error: {}", e)),
        )
    }
}

#[tool_handler]
impl ServerHandler for AnnotatorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol; logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let json_dir = resolve_json_dir(
        std::env::args().nth(1),
        &annotator_core::read_settings(),
        std::env::current_dir()?,
    );
    log::info!("serving annotations from {}", json_dir.display());

    let service = AnnotatorServer::new(json_dir)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| eprintln!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}
