//! The controller between the annotation panels and the store.
//!
//! Panels send [`Intent`]s; the session applies them to the one live
//! [`AnnotationStore`] and pushes a fresh [`Snapshot`] to every subscriber.
//! Switching images always runs save(old), clear, load(new) in that order.

use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};

use crate::consistency::Inconsistency;
use crate::images::{annotation_path, list_images};
use crate::view::{arrows, Arrow, ArrowFilter};
use crate::{
    add_skip_reason, delete_document, AnnotationStore, BoundingBox, ComponentDetails,
    ConnectionKind, Result, SaveOutcome, Settings,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    DrawingBox,
    ConnectSource(ConnectionKind),
    ConnectTarget { kind: ConnectionKind, source: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    OpenImageFolder(PathBuf),
    OpenJsonFolder(PathBuf),
    SelectImage(usize),
    NextImage,
    PrevImage,
    Save,
    SkipImage(String),
    /// Drop the skip marker of the current image so it can be annotated again.
    Unskip,
    AddSkipReason(String),
    BeginDrawBox,
    /// The canvas finished a rubber-band box and the name dialog returned `name`.
    BoxDrawn { name: String, bbox: BoundingBox },
    BeginConnect(ConnectionKind),
    /// A click on the canvas, already resolved to the component under it.
    CanvasClicked(Option<String>),
    Cancel,
    SelectComponent(Option<String>),
    DeleteComponent(String),
    DeleteConnection {
        source: String,
        target: String,
        kind: ConnectionKind,
    },
    RenameComponent { from: String, to: String },
    EditConnections {
        component: String,
        kind: ConnectionKind,
        text: String,
    },
    ToggleConnectionsView,
    Close,
}

/// Everything the panels render, taken after each intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub image: Option<String>,
    pub image_index: Option<usize>,
    pub image_count: usize,
    pub mode: Mode,
    pub selected: Option<String>,
    pub components: Vec<String>,
    pub details: Option<ComponentDetails>,
    pub arrows: Vec<Arrow>,
    pub inconsistencies: Vec<Inconsistency>,
    pub skipped_reason: Option<String>,
    pub skip_reasons: Vec<String>,
    pub show_all_connections: bool,
    pub status: String,
    pub can_draw: bool,
    pub can_connect: bool,
    pub can_prev: bool,
    pub can_next: bool,
}

pub struct Session {
    store: AnnotationStore,
    image_folder: Option<PathBuf>,
    json_folder: Option<PathBuf>,
    images: Vec<String>,
    current: Option<usize>,
    mode: Mode,
    selected: Option<String>,
    show_all_connections: bool,
    skip_reasons: Vec<String>,
    status: String,
    subscribers: Vec<Sender<Snapshot>>,
}

impl Session {
    /// Folders in `settings` are not opened; send the intents to do that.
    pub fn new(settings: &Settings) -> Self {
        Self {
            store: AnnotationStore::new(),
            image_folder: None,
            json_folder: None,
            images: Vec::new(),
            current: None,
            mode: Mode::Idle,
            selected: None,
            show_all_connections: true,
            skip_reasons: settings.skip_reasons.clone(),
            status: "Ready".to_string(),
            subscribers: Vec::new(),
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current
            .and_then(|i| self.images.get(i))
            .map(String::as_str)
    }

    /// The JSON file the current image saves to, when both folders are known.
    pub fn current_annotation_path(&self) -> Option<PathBuf> {
        let json_folder = self.json_folder.as_deref()?;
        let image = self.current_image()?;
        Some(annotation_path(json_folder, image))
    }

    /// Current folders and skip reasons, for writing back to the settings file.
    pub fn settings(&self) -> Settings {
        Settings {
            image_folder: self.image_folder.clone(),
            json_folder: self.json_folder.clone(),
            skip_reasons: self.skip_reasons.clone(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Apply one intent and publish a snapshot, also when the intent fails.
    ///
    /// Errors are a name conflict on add/rename, a failed save, or an
    /// unreadable image folder; in every case the document is unchanged.
    pub fn handle(&mut self, intent: Intent) -> Result<()> {
        let result = self.apply(intent);
        if let Err(e) = &result {
            log::warn!("{}", e);
            self.status = e.to_string();
        }
        self.publish();
        result
    }

    pub fn snapshot(&self) -> Snapshot {
        let annotatable = !self.images.is_empty() && self.store.skipped_reason().is_none();
        let idle = self.mode == Mode::Idle;
        let visible = match (&self.selected, self.show_all_connections) {
            (_, true) => arrows(&self.store, &ArrowFilter::All),
            (Some(name), false) => arrows(&self.store, &ArrowFilter::Selected(name.clone())),
            (None, false) => Vec::new(),
        };

        Snapshot {
            image: self.current_image().map(str::to_string),
            image_index: self.current,
            image_count: self.images.len(),
            mode: self.mode.clone(),
            selected: self.selected.clone(),
            components: self.store.sorted_names(),
            details: self.selected.as_deref().and_then(|n| self.store.details(n)),
            arrows: visible,
            inconsistencies: self.store.find_inconsistent_connections().into_iter().collect(),
            skipped_reason: self.store.skipped_reason().map(str::to_string),
            skip_reasons: self.skip_reasons.clone(),
            show_all_connections: self.show_all_connections,
            status: self.status.clone(),
            can_draw: annotatable && idle,
            can_connect: annotatable && idle,
            can_prev: idle && self.current.is_some_and(|i| i > 0),
            can_next: idle && self.current.is_some_and(|i| i + 1 < self.images.len()),
        }
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    fn apply(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::OpenImageFolder(folder) => self.open_image_folder(folder),
            Intent::OpenJsonFolder(folder) => self.open_json_folder(folder),
            Intent::SelectImage(index) => self.navigate(index),
            Intent::NextImage => match self.current {
                Some(i) if i + 1 < self.images.len() => self.navigate(i + 1),
                _ => Ok(()),
            },
            Intent::PrevImage => match self.current {
                Some(i) if i > 0 => self.navigate(i - 1),
                _ => Ok(()),
            },
            Intent::Save => {
                self.status = match self.save_current()? {
                    SaveOutcome::Written => "Saved".to_string(),
                    SaveOutcome::NothingToSave => "Nothing to save".to_string(),
                };
                Ok(())
            }
            Intent::SkipImage(reason) => self.skip_current(reason),
            Intent::Unskip => self.unskip_current(),
            Intent::AddSkipReason(reason) => {
                add_skip_reason(&mut self.skip_reasons, &reason);
                Ok(())
            }
            Intent::BeginDrawBox => {
                self.begin(Mode::DrawingBox);
                Ok(())
            }
            Intent::BeginConnect(kind) => {
                self.begin(Mode::ConnectSource(kind));
                Ok(())
            }
            Intent::BoxDrawn { name, bbox } => {
                if !self.editable() {
                    self.mode = Mode::Idle;
                    return Ok(());
                }
                self.box_drawn(&name, bbox)
            }
            Intent::CanvasClicked(hit) => {
                self.canvas_clicked(hit);
                Ok(())
            }
            Intent::Cancel => {
                self.cancel();
                Ok(())
            }
            Intent::SelectComponent(name) => {
                self.select(name);
                Ok(())
            }
            Intent::DeleteComponent(_)
            | Intent::DeleteConnection { .. }
            | Intent::RenameComponent { .. }
            | Intent::EditConnections { .. }
                if !self.editable() =>
            {
                Ok(())
            }
            Intent::DeleteComponent(name) => {
                if self.selected.as_deref() == Some(name.as_str()) {
                    self.selected = None;
                }
                self.store.remove_component(&name);
                self.status = format!("Deleted '{}'", name);
                Ok(())
            }
            Intent::DeleteConnection { source, target, kind } => {
                self.store.remove_connection(&source, &target, kind);
                Ok(())
            }
            Intent::RenameComponent { from, to } => {
                let to = to.trim();
                if to.is_empty() {
                    return Ok(());
                }
                self.store.rename_component(&from, to)?;
                if self.selected.as_deref() == Some(from.as_str()) {
                    self.selected = Some(to.to_string());
                }
                Ok(())
            }
            Intent::EditConnections {
                component,
                kind,
                text,
            } => {
                self.store.update_connections_from_text(&component, kind, &text);
                Ok(())
            }
            Intent::ToggleConnectionsView => {
                self.show_all_connections = !self.show_all_connections;
                Ok(())
            }
            Intent::Close => self.save_current().map(|_| ()),
        }
    }

    fn open_image_folder(&mut self, folder: PathBuf) -> Result<()> {
        self.cancel();
        self.save_current()?;
        let images = list_images(&folder)?;
        log::info!("opened {} with {} image(s)", folder.display(), images.len());

        self.image_folder = Some(folder);
        self.images = images;
        self.current = None;
        self.selected = None;
        self.store.clear();

        if self.images.is_empty() {
            self.status = "No images found".to_string();
            Ok(())
        } else {
            self.navigate(0)
        }
    }

    // The current document is flushed to the old folder first. Annotations
    // made before any JSON folder was chosen are kept when the new folder has
    // no file for this image yet; they land there on the next save.
    fn open_json_folder(&mut self, folder: PathBuf) -> Result<()> {
        self.cancel();
        self.save_current()?;
        self.json_folder = Some(folder);
        let Some(path) = self.current_annotation_path() else {
            return Ok(());
        };
        if path.exists() {
            self.selected = None;
            self.store.load_from_path(&path);
        }
        Ok(())
    }

    fn navigate(&mut self, index: usize) -> Result<()> {
        if index >= self.images.len() {
            return Ok(());
        }
        self.cancel();
        // Nothing of the next image is touched until the current one is flushed.
        self.save_current()?;
        if self.current == Some(index) {
            return Ok(());
        }

        self.current = Some(index);
        self.selected = None;
        self.store.clear();
        if let Some(path) = self.current_annotation_path() {
            self.store.load_from_path(&path);
        }
        self.status = format!("Opened {}", self.images[index]);
        log::info!("{}", self.status);
        Ok(())
    }

    fn save_current(&mut self) -> Result<SaveOutcome> {
        match self.current_annotation_path() {
            Some(path) => self.store.save_to_path(&path),
            None => Ok(SaveOutcome::NothingToSave),
        }
    }

    fn skip_current(&mut self, reason: String) -> Result<()> {
        let Some(index) = self.current else {
            self.status = "No image to skip".to_string();
            return Ok(());
        };
        self.cancel();
        let reason = reason.trim();
        let mut skipped = AnnotationStore::new();
        skipped.set_skipped(reason);
        if let Some(path) = self.current_annotation_path() {
            skipped.save_to_path(&path)?;
        }
        self.store = skipped;
        self.selected = None;
        log::info!("skipped {}: {}", self.images[index], reason);

        if index + 1 < self.images.len() {
            self.navigate(index + 1)
        } else {
            self.status = format!("Skipped {}", self.images[index]);
            Ok(())
        }
    }

    // The marker file goes too, otherwise the empty document would never
    // overwrite it and the image would load as skipped again.
    fn unskip_current(&mut self) -> Result<()> {
        if self.store.skipped_reason().is_none() {
            return Ok(());
        }
        if let Some(path) = self.current_annotation_path() {
            delete_document(&path)?;
        }
        self.store.clear_skipped();
        self.status = "Unskipped".to_string();
        Ok(())
    }

    /// False, with a status message, while the current image is skipped.
    fn editable(&mut self) -> bool {
        match self.store.skipped_reason() {
            Some(reason) => {
                self.status = format!("Image is skipped ({}). Unskip it to annotate.", reason);
                false
            }
            None => true,
        }
    }

    // Asking for a mode while another one runs cancels instead.
    fn begin(&mut self, mode: Mode) {
        if self.mode != Mode::Idle {
            self.cancel();
            return;
        }
        if self.current.is_none() {
            self.status = "Open an image folder first".to_string();
            return;
        }
        if !self.editable() {
            return;
        }
        self.status = match &mode {
            Mode::DrawingBox => "DRAW MODE: drag a box around the component.".to_string(),
            Mode::ConnectSource(_) => {
                "CONNECT MODE: Click the SOURCE component. (Press Esc to cancel)".to_string()
            }
            _ => String::new(),
        };
        self.mode = mode;
    }

    fn box_drawn(&mut self, name: &str, bbox: BoundingBox) -> Result<()> {
        self.mode = Mode::Idle;
        let name = name.trim();
        if name.is_empty() {
            self.status = "Canceled".to_string();
            return Ok(());
        }
        self.store.add_component(name, bbox)?;
        self.selected = Some(name.to_string());
        self.status = format!("Added '{}'", name);
        Ok(())
    }

    fn canvas_clicked(&mut self, hit: Option<String>) {
        match self.mode.clone() {
            Mode::Idle | Mode::DrawingBox => self.select(hit),
            Mode::ConnectSource(kind) => match hit {
                Some(source) if self.store.contains(&source) => {
                    self.status = format!("Source: '{}'. Click the TARGET component.", source);
                    self.mode = Mode::ConnectTarget { kind, source };
                }
                _ => self.cancel(),
            },
            Mode::ConnectTarget { kind, source } => {
                match hit {
                    Some(target) if target != source && self.store.contains(&target) => {
                        self.store.add_connection(&source, &target, kind);
                        self.status = match kind {
                            ConnectionKind::Inout => "Success: Created Bidirectional Arrow.",
                            _ => "Success: Created Unidirectional Arrow.",
                        }
                        .to_string();
                    }
                    _ => {
                        self.status = "Invalid target or same as source. Canceled.".to_string();
                    }
                }
                self.mode = Mode::Idle;
            }
        }
    }

    // Selecting the selected component again clears the selection.
    fn select(&mut self, name: Option<String>) {
        self.selected = match name {
            Some(name) if self.selected.as_deref() != Some(name.as_str()) && self.store.contains(&name) => {
                Some(name)
            }
            _ => None,
        };
    }

    fn cancel(&mut self) {
        if self.mode != Mode::Idle {
            self.mode = Mode::Idle;
            self.status = "Operation Canceled".to_string();
        }
    }
}

/// Convenience for front ends that keep the folders in the settings file.
pub fn open_from_settings(session: &mut Session, settings: &Settings) -> Result<()> {
    if let Some(json) = settings.json_folder.as_deref() {
        session.handle(Intent::OpenJsonFolder(json.to_path_buf()))?;
    }
    if let Some(images) = settings.image_folder.as_deref().filter(|p| p.is_dir()) {
        session.handle(Intent::OpenImageFolder(images.to_path_buf()))?;
    }
    Ok(())
}
