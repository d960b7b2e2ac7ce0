//! The editor context: one owned aggregate over the layer store, history,
//! interaction session, repaint scheduling and resource loading. Every
//! operation flows through here, which is also where the snapshot policy is
//! enforced: discrete structural operations record the pre-mutation state,
//! continuous edits (pointer moves, slider input, nudges) do not. Starting a
//! drag captures its starting state lazily, on the first actual move, so
//! plain selection clicks don't pollute the undo stack.

use std::collections::HashMap;
use std::sync::Arc;

use egui::{pos2, Color32, Pos2};
use image::RgbaImage;
use log::{info, warn};

use crate::canvas::{AspectRatio, CanvasSize};
use crate::error::EditorError;
use crate::history::{History, Snapshot};
use crate::hit_test::HitTester;
use crate::input::{InputEvent, KeyAction, NudgeDirection};
use crate::interaction::{
    Session, SessionState, Tool, DUPLICATE_OFFSET, MIN_POINT_DISTANCE, NUDGE_STEP, NUDGE_STEP_LARGE,
};
use crate::layer::{
    DrawPayload, ImagePayload, Layer, LayerContent, LayerId, LayerKind, TextPayload,
};
use crate::loader::{
    ImageLoader, ImageResource, ImageSource, LoadCompletion, RequestToken, ResourceBroker,
};
use crate::render::text::FontStore;
use crate::render::{Compositor, RepaintScheduler};
use crate::store::{LayerStore, MAX_LAYERS};

/// Where non-text layers land by default.
pub const DEFAULT_LAYER_POSITION: Pos2 = Pos2::new(60.0, 60.0);
/// Where new text layers land by default.
pub const DEFAULT_TEXT_POSITION: Pos2 = Pos2::new(80.0, 80.0);

/// Current freehand brush settings; new stroke layers copy these.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushStyle {
    pub color: Color32,
    pub width: f32,
}

impl Default for BrushStyle {
    fn default() -> Self {
        Self {
            color: Color32::BLACK,
            width: 8.0,
        }
    }
}

/// What an in-flight load is for.
enum PendingLoad {
    /// A layer waiting for its first resource.
    Layer { layer: LayerId },
    /// Part of a snapshot restore.
    Restore { layer: LayerId },
}

/// A snapshot restore waiting for its resources. The store stays empty until
/// every request has settled, then is filled in one pass.
struct PendingRestore {
    snapshot: Snapshot,
    resolved: HashMap<LayerId, Arc<ImageResource>>,
    remaining: usize,
}

pub struct EditorContext {
    store: LayerStore,
    history: History,
    session: Session,
    scheduler: RepaintScheduler,
    compositor: Compositor,
    hit_tester: HitTester,
    fonts: FontStore,
    broker: ResourceBroker,
    pending: HashMap<RequestToken, PendingLoad>,
    restore: Option<PendingRestore>,
    drag_snapshot: Option<Snapshot>,
    canvas: CanvasSize,
    aspect: AspectRatio,
    status: String,
    dirty: bool,
    /// Style applied to newly created text layers.
    pub text_style: TextPayload,
    /// Style applied to newly created stroke layers.
    pub brush: BrushStyle,
}

impl EditorContext {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            store: LayerStore::new(),
            history: History::new(),
            session: Session::new(),
            scheduler: RepaintScheduler::new(),
            compositor: Compositor::new(),
            hit_tester: HitTester::new(),
            fonts: FontStore::new(),
            broker: ResourceBroker::new(loader),
            pending: HashMap::new(),
            restore: None,
            drag_snapshot: None,
            canvas: CanvasSize::default(),
            aspect: AspectRatio::default(),
            status: String::from("Ready."),
            dirty: false,
            text_style: TextPayload::default(),
            brush: BrushStyle::default(),
        }
    }

    // --- accessors ---

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    pub fn tool(&self) -> Tool {
        self.session.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.session.tool = tool;
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn fonts(&self) -> &FontStore {
        &self.fonts
    }

    pub fn register_font(&mut self, family: &str, bytes: Vec<u8>) -> bool {
        match self.fonts.register(family, bytes) {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to register font {family:?}: {err}");
                false
            }
        }
    }

    /// True while a snapshot restore is still waiting for resources.
    pub fn restore_in_progress(&self) -> bool {
        self.restore.is_some()
    }

    /// Number of resource loads still outstanding.
    pub fn loads_in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Select a layer (or clear with `None`). Selection changes are not
    /// snapshotted on their own.
    pub fn select_layer(&mut self, id: Option<LayerId>) {
        self.store.set_selected(id);
        self.scheduler.request();
    }

    fn capture(&self) -> Snapshot {
        Snapshot::capture(&self.store, self.canvas, self.aspect)
    }

    fn record_history(&mut self) {
        let snapshot = self.capture();
        self.history.record(snapshot);
    }

    /// Mark the document changed and ask for a coalesced repaint.
    fn touch(&mut self) {
        self.dirty = true;
        self.scheduler.request();
    }

    fn fail(&mut self, err: EditorError) -> EditorError {
        self.set_status(err.to_string());
        err
    }

    // --- layer creation (discrete operations) ---

    fn add_with_snapshot(&mut self, layer: Layer) -> Result<LayerId, EditorError> {
        if self.store.len() >= MAX_LAYERS {
            return Err(self.fail(EditorError::CapacityExceeded(MAX_LAYERS)));
        }
        self.record_history();
        let id = self
            .store
            .add(layer)
            .expect("capacity checked before snapshot");
        self.store.set_selected(Some(id));
        self.touch();
        Ok(id)
    }

    /// Create a text layer from the current text style. Empty (or
    /// whitespace-only) input is rejected before anything mutates.
    pub fn add_text_layer(&mut self, text: &str) -> Result<LayerId, EditorError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(self.fail(EditorError::EmptyInput));
        }
        let payload = TextPayload {
            text: trimmed.to_owned(),
            ..self.text_style.clone()
        };
        let id = self.add_with_snapshot(Layer::new(LayerContent::Text(payload), DEFAULT_TEXT_POSITION))?;
        self.set_status("Text added.");
        Ok(id)
    }

    /// Add a sticker layer. The layer is selectable immediately; it paints
    /// once its resource load resolves.
    pub fn add_sticker_layer(&mut self, source: ImageSource) -> Result<LayerId, EditorError> {
        let layer = Layer::new(
            LayerContent::Sticker(ImagePayload::pending(source.clone())),
            DEFAULT_LAYER_POSITION,
        );
        let id = self.add_with_snapshot(layer)?;
        self.request_layer_load(id, source);
        self.set_status("Sticker added.");
        Ok(id)
    }

    /// Add an uploaded image as a regular layer.
    pub fn add_upload_layer(&mut self, source: ImageSource) -> Result<LayerId, EditorError> {
        let layer = Layer::new(
            LayerContent::Image(ImagePayload::pending(source.clone())),
            DEFAULT_LAYER_POSITION,
        );
        let id = self.add_with_snapshot(layer)?;
        self.request_layer_load(id, source);
        self.set_status("Image added.");
        Ok(id)
    }

    /// Install (or replace) the base layer. The canvas adopts the image's
    /// intrinsic size once the load resolves. A replacement supersedes any
    /// base load still in flight.
    pub fn set_base_image(&mut self, source: ImageSource) -> Result<LayerId, EditorError> {
        if !self.store.has_base() && self.store.len() >= MAX_LAYERS {
            return Err(self.fail(EditorError::CapacityExceeded(MAX_LAYERS)));
        }
        self.record_history();
        let id = self
            .store
            .set_base(Layer::base(source.clone()))
            .expect("capacity checked before snapshot");
        self.store.set_selected(Some(id));
        self.request_layer_load(id, source);
        self.touch();
        self.set_status("Base image loading.");
        Ok(id)
    }

    fn request_layer_load(&mut self, id: LayerId, source: ImageSource) {
        let token = self.broker.request(source);
        self.pending.insert(token, PendingLoad::Layer { layer: id });
    }

    // --- structural edits (discrete operations) ---

    pub fn delete_selected(&mut self) -> bool {
        let Some(layer) = self.store.selected_layer() else {
            return false;
        };
        if layer.locked {
            return false;
        }
        let id = layer.id;
        self.record_history();
        self.store.remove(id);
        self.touch();
        self.set_status("Layer deleted.");
        true
    }

    /// Duplicate the selected layer: payload and presentation are copied,
    /// the resource handle is shared (no new load), and the duplicate is
    /// always unlocked. A duplicated base becomes a regular image layer so
    /// the single-base invariant holds.
    pub fn duplicate_selected(&mut self) -> Option<LayerId> {
        let layer = self.store.selected_layer()?;
        let mut copy = layer.duplicate(DUPLICATE_OFFSET);
        if let LayerContent::Base(payload) = copy.content {
            copy.content = LayerContent::Image(payload);
        }
        match self.add_with_snapshot(copy) {
            Ok(id) => {
                self.set_status("Layer duplicated.");
                Some(id)
            }
            Err(_) => None,
        }
    }

    /// Move the selected layer up (+1) or down (-1) in paint order.
    pub fn reorder_selected(&mut self, delta: isize) -> bool {
        let Some(layer) = self.store.selected_layer() else {
            return false;
        };
        let id = layer.id;
        if !self.store.can_reorder(id, delta) {
            return false;
        }
        self.record_history();
        self.store.reorder(id, delta);
        self.touch();
        true
    }

    pub fn toggle_selected_visibility(&mut self) -> bool {
        if self.store.selected_layer().is_none() {
            return false;
        }
        self.record_history();
        let layer = self.store.selected_layer_mut().expect("checked above");
        layer.visible = !layer.visible;
        self.touch();
        true
    }

    pub fn set_aspect(&mut self, aspect: AspectRatio) {
        self.record_history();
        self.aspect = aspect;
        self.canvas = aspect.canvas_size();
        self.touch();
    }

    // --- continuous property edits (not snapshotted) ---

    pub fn set_selected_position(&mut self, position: Pos2) {
        if let Some(layer) = self.store.selected_layer_mut() {
            if layer.locked {
                return;
            }
            layer.position = position;
            self.touch();
        }
    }

    pub fn set_selected_scale(&mut self, scale: f32) {
        if let Some(layer) = self.store.selected_layer_mut() {
            layer.set_scale(scale);
            self.touch();
        }
    }

    pub fn set_selected_rotation(&mut self, degrees: f32) {
        if let Some(layer) = self.store.selected_layer_mut() {
            layer.rotation = degrees;
            self.touch();
        }
    }

    pub fn set_selected_opacity(&mut self, opacity: f32) {
        if let Some(layer) = self.store.selected_layer_mut() {
            layer.set_opacity(opacity);
            self.touch();
        }
    }

    /// Live-edit the selected text layer's content.
    pub fn edit_selected_text(&mut self, text: &str) {
        if let Some(layer) = self.store.selected_layer_mut() {
            if let LayerContent::Text(payload) = &mut layer.content {
                payload.text = text.to_owned();
                self.touch();
            }
        }
    }

    /// Apply the current text style (everything but the content) to the
    /// selected text layer.
    pub fn restyle_selected_text(&mut self) {
        let style = self.text_style.clone();
        if let Some(layer) = self.store.selected_layer_mut() {
            if let LayerContent::Text(payload) = &mut layer.content {
                payload.font = style.font;
                payload.size = style.size;
                payload.color = style.color;
                payload.stroke = style.stroke;
                payload.align = style.align;
                self.touch();
            }
        }
    }

    pub fn nudge_selected(&mut self, direction: NudgeDirection, large: bool) -> bool {
        let Some(layer) = self.store.selected_layer_mut() else {
            return false;
        };
        if layer.locked {
            return false;
        }
        let step = if large { NUDGE_STEP_LARGE } else { NUDGE_STEP };
        layer.position += direction.delta() * step;
        self.touch();
        true
    }

    // --- undo / redo ---

    pub fn undo(&mut self) -> Result<(), EditorError> {
        let current = self.capture();
        match self.history.undo(current) {
            Ok(snapshot) => {
                self.begin_restore(snapshot);
                self.set_status("Undo.");
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn redo(&mut self) -> Result<(), EditorError> {
        let current = self.capture();
        match self.history.redo(current) {
            Ok(snapshot) => {
                self.begin_restore(snapshot);
                self.set_status("Redo.");
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Start restoring a snapshot. The store empties immediately; the
    /// layers come back in one pass once every resource request has
    /// settled. Requests run concurrently, and one failure never aborts the
    /// others; the failed layer just comes back unpainted.
    fn begin_restore(&mut self, snapshot: Snapshot) {
        // A newer restore supersedes one still in flight.
        self.pending
            .retain(|_, load| !matches!(load, PendingLoad::Restore { .. }));
        self.restore = None;

        self.store.clear();
        self.canvas = snapshot.canvas;
        self.aspect = snapshot.aspect;
        self.session.finish();
        self.drag_snapshot = None;

        let mut remaining = 0;
        let mut requests = Vec::new();
        for layer in &snapshot.layers {
            if let Some(payload) = layer.content.image_payload() {
                requests.push((layer.id, payload.source.clone()));
            }
        }
        for (id, source) in requests {
            let token = self.broker.request(source);
            self.pending.insert(token, PendingLoad::Restore { layer: id });
            remaining += 1;
        }

        self.restore = Some(PendingRestore {
            snapshot,
            resolved: HashMap::new(),
            remaining,
        });
        self.dirty = true;
        if remaining == 0 {
            self.commit_restore();
        }
    }

    fn commit_restore(&mut self) {
        let Some(pending) = self.restore.take() else {
            return;
        };
        let mut layers = pending.snapshot.layers;
        for layer in &mut layers {
            if let Some(resource) = pending.resolved.get(&layer.id) {
                layer.resource = Some(Arc::clone(resource));
            }
        }
        self.store.replace_all(layers, pending.snapshot.selected);
        self.scheduler.request();
    }

    // --- resource completions ---

    /// Drain finished loads from the broker. The shell calls this once per
    /// frame; tests call it (or `wait_for_loads`) explicitly.
    pub fn pump(&mut self) {
        for completion in self.broker.poll() {
            self.apply_completion(completion);
        }
    }

    /// Block until every outstanding load has settled.
    pub fn wait_for_loads(&mut self) {
        while !self.pending.is_empty() {
            let Some(completion) = self.broker.recv_blocking() else {
                break;
            };
            self.apply_completion(completion);
        }
    }

    fn apply_completion(&mut self, completion: LoadCompletion) {
        let Some(load) = self.pending.remove(&completion.token) else {
            // Superseded request; the result is discarded.
            return;
        };
        match load {
            PendingLoad::Layer { layer } => match completion.result {
                Ok(resource) => self.attach_resource(layer, resource),
                Err(err) => {
                    warn!("image load failed: {err}");
                    self.set_status(EditorError::ResourceLoadFailed.to_string());
                }
            },
            PendingLoad::Restore { layer } => {
                let Some(restore) = self.restore.as_mut() else {
                    return;
                };
                restore.remaining = restore.remaining.saturating_sub(1);
                match completion.result {
                    Ok(resource) => {
                        restore.resolved.insert(layer, resource);
                    }
                    Err(err) => {
                        // Isolated: siblings keep loading, this layer comes
                        // back unpainted.
                        warn!("failed to restore image layer {layer}: {err}");
                    }
                }
                if restore.remaining == 0 {
                    self.commit_restore();
                }
            }
        }
    }

    fn attach_resource(&mut self, id: LayerId, resource: Arc<ImageResource>) {
        let Some(layer) = self.store.get_mut(id) else {
            // The layer was deleted (or its base slot replaced) while the
            // load was in flight.
            return;
        };
        let width = resource.width() as f32;
        let height = resource.height() as f32;
        if let Some(payload) = layer.content.image_payload_mut() {
            if payload.width <= 0.0 || payload.height <= 0.0 {
                payload.width = width;
                payload.height = height;
            }
        }
        let is_base = layer.kind() == LayerKind::Base;
        layer.resource = Some(resource);
        if is_base {
            // The canvas always matches the base image's intrinsic size.
            self.canvas = CanvasSize::new(width as u32, height as u32);
            info!("canvas resized to {}x{} from base image", width, height);
        }
        self.scheduler.request();
    }

    // --- pointer / keyboard state machine ---

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown(pos) => self.pointer_down(pos),
            InputEvent::PointerMove(pos) => self.pointer_move(pos),
            InputEvent::PointerUp | InputEvent::PointerLeave => {
                self.session.finish();
                self.drag_snapshot = None;
            }
            InputEvent::Key(action) => self.key_action(action),
        }
    }

    fn pointer_down(&mut self, pos: Pos2) {
        match self.session.tool {
            Tool::Draw => {
                // A new stroke layer anchored at the down point; the first
                // local point is the origin.
                let payload = DrawPayload {
                    color: self.brush.color,
                    width: self.brush.width,
                    points: vec![Pos2::ZERO],
                };
                if let Ok(id) = self.add_with_snapshot(Layer::new(LayerContent::Draw(payload), pos)) {
                    self.session.begin_stroke(id);
                }
            }
            Tool::Select => match self.hit_tester.hit_test(&self.store, &self.fonts, pos) {
                Some(id) => {
                    let layer = self.store.get(id).expect("hit layer exists");
                    let locked = layer.locked;
                    let position = layer.position;
                    if !locked {
                        // The drag's starting state; recorded only if the
                        // pointer actually moves.
                        self.drag_snapshot = Some(self.capture());
                    }
                    self.store.set_selected(Some(id));
                    // Locked layers can be selected but never dragged.
                    if !locked {
                        self.session.begin_drag(id, pos - position);
                    }
                }
                None => self.store.set_selected(None),
            },
        }
    }

    fn pointer_move(&mut self, pos: Pos2) {
        match self.session.state() {
            SessionState::Drawing { layer } => {
                let Some(layer) = self.store.get_mut(layer) else {
                    return;
                };
                let point = pos2(pos.x - layer.position.x, pos.y - layer.position.y);
                let LayerContent::Draw(payload) = &mut layer.content else {
                    return;
                };
                let Some(last) = payload.points.last() else {
                    return;
                };
                // Decimate: samples closer than the threshold are dropped.
                if (point - *last).length() >= MIN_POINT_DISTANCE {
                    payload.points.push(point);
                    self.touch();
                }
            }
            SessionState::Dragging { layer, grab_offset } => {
                if self.store.get(layer).is_none() {
                    return;
                }
                if let Some(snapshot) = self.drag_snapshot.take() {
                    self.history.record(snapshot);
                }
                let moved = self.store.get_mut(layer).expect("checked above");
                // No clamping: layers may move off-canvas freely.
                moved.position = pos - grab_offset;
                self.touch();
            }
            SessionState::Idle => {}
        }
    }

    fn key_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::Undo => {
                let _ = self.undo();
            }
            KeyAction::Redo => {
                let _ = self.redo();
            }
            KeyAction::DeleteSelected => {
                self.delete_selected();
            }
            KeyAction::DuplicateSelected => {
                self.duplicate_selected();
            }
            KeyAction::Nudge { direction, large } => {
                self.nudge_selected(direction, large);
            }
        }
    }

    // --- rendering / export ---

    pub fn request_repaint(&mut self) {
        self.scheduler.request();
    }

    /// One coalesced paint: renders only when something requested a repaint
    /// since the last call, and never while a restore is waiting on
    /// resources.
    pub fn render_if_dirty(&mut self) -> Option<RgbaImage> {
        if self.restore.is_some() {
            return None;
        }
        if !self.scheduler.take() {
            return None;
        }
        Some(self.compositor.render(&self.store, &self.fonts, self.canvas))
    }

    /// Unconditional render of the current document.
    pub fn render_now(&mut self) -> RgbaImage {
        self.compositor.render(&self.store, &self.fonts, self.canvas)
    }

    /// Lossless PNG of the current canvas pixels. Refused while nothing is
    /// visible.
    pub fn export_png(&mut self) -> Result<Vec<u8>, EditorError> {
        if !self.store.has_visible_content() {
            return Err(self.fail(EditorError::ExportPreconditionFailed));
        }
        let image = self.render_now();
        match crate::export::encode_png(&image) {
            Ok(bytes) => {
                self.dirty = false;
                self.set_status("Export ready.");
                Ok(bytes)
            }
            Err(err) => Err(self.fail(err)),
        }
    }
}
