//! The eframe shell around the composition engine: panels for tools and
//! layer properties, pointer/keyboard translation, and the composed-surface
//! texture upload. Everything document-shaped lives in [`EditorContext`];
//! this file only speaks egui.

use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui::{self, Color32, ColorImage, Pos2, Rect, TextureHandle, TextureOptions};
use log::{error, info, warn};

use crate::assets::AssetManifest;
use crate::canvas::AspectRatio;
use crate::editor::EditorContext;
use crate::input::{InputEvent, KeyAction};
use crate::interaction::Tool;
use crate::layer::{LayerId, TextAlign};
use crate::loader::{DecodingLoader, ImageSource};

pub struct StudioApp {
    editor: EditorContext,
    manifest: AssetManifest,
    asset_root: PathBuf,
    texture: Option<TextureHandle>,
    text_input: String,
    export_path: PathBuf,
    confirm_close: bool,
    close_allowed: bool,
}

impl StudioApp {
    /// Called once before the first frame.
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let asset_root = PathBuf::from("assets");
        let manifest = match AssetManifest::from_path(&asset_root.join("manifest.json")) {
            Ok(manifest) => manifest,
            Err(err) => {
                error!("failed to load asset manifest: {err}");
                AssetManifest::default()
            }
        };

        let mut editor = EditorContext::new(Arc::new(DecodingLoader::new()));
        manifest.register_fonts(&asset_root, &mut editor);
        if let Some(font) = manifest.fonts.first() {
            editor.text_style.font = font.family.clone();
        }
        editor.request_repaint();

        Self {
            editor,
            manifest,
            asset_root,
            texture: None,
            text_input: String::new(),
            export_path: PathBuf::from("meme.png"),
            confirm_close: false,
            close_allowed: false,
        }
    }

    /// Intercept the window close while the composition has unexported
    /// changes.
    fn close_guard(&mut self, ctx: &egui::Context) {
        if ctx.input(|input| input.viewport().close_requested())
            && self.editor.has_unsaved_changes()
            && !self.close_allowed
        {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.confirm_close = true;
        }
        if !self.confirm_close {
            return;
        }
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("The composition has not been exported. Close anyway?");
                ui.horizontal(|ui| {
                    if ui.button("Keep editing").clicked() {
                        self.confirm_close = false;
                    }
                    if ui.button("Discard and close").clicked() {
                        self.close_allowed = true;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
    }

    /// Keyboard shortcuts, suppressed while any text field has focus.
    fn translate_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let actions: Vec<KeyAction> = ctx.input(|input| {
            input
                .raw
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } => KeyAction::from_key(*key, *modifiers),
                    _ => None,
                })
                .collect()
        });
        for action in actions {
            self.editor.handle_event(InputEvent::Key(action));
        }
    }

    /// Image files dropped onto the window become regular upload layers.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        for file in dropped {
            match Self::dropped_file_source(&file) {
                Some(source) => {
                    let _ = self.editor.add_upload_layer(source);
                }
                None => warn!("dropped file is not a supported image: {}", file.name),
            }
        }
    }

    fn dropped_file_source(file: &egui::DroppedFile) -> Option<ImageSource> {
        // Web builds deliver bytes; native builds deliver a path.
        if let Some(bytes) = &file.bytes {
            return Some(ImageSource::Memory(bytes.to_vec()));
        }
        let path = file.path.as_ref()?;
        let is_image = if !file.mime.is_empty() {
            file.mime.starts_with("image/")
        } else {
            let ext = path.extension()?.to_string_lossy().to_lowercase();
            matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp")
        };
        is_image.then(|| ImageSource::Path(path.clone()))
    }

    /// Overlay shown while files hover over the window.
    fn preview_file_drop(&self, ctx: &egui::Context) {
        if ctx.input(|input| input.raw.hovered_files.is_empty()) {
            return;
        }
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("file-drop-target"),
        ));
        let rect = ctx.screen_rect();
        painter.rect_filled(rect, 0.0, Color32::from_black_alpha(160));
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Drop image to add a layer",
            egui::TextStyle::Heading.resolve(&ctx.style()),
            Color32::WHITE,
        );
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let canvas = self.editor.canvas();
        let available = ui.available_size();
        let scale = (available.x / canvas.width as f32)
            .min(available.y / canvas.height as f32)
            .min(1.0)
            .max(0.01);
        let display = egui::vec2(canvas.width as f32 * scale, canvas.height as f32 * scale);
        let (response, painter) = ui.allocate_painter(display, egui::Sense::click_and_drag());
        let rect = response.rect;

        let to_canvas =
            |pos: Pos2| egui::pos2((pos.x - rect.min.x) / scale, (pos.y - rect.min.y) / scale);

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.editor.handle_event(InputEvent::PointerDown(to_canvas(pos)));
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.editor.handle_event(InputEvent::PointerMove(to_canvas(pos)));
            }
        }
        if response.drag_stopped() {
            self.editor.handle_event(InputEvent::PointerUp);
        }
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.editor.handle_event(InputEvent::PointerDown(to_canvas(pos)));
                self.editor.handle_event(InputEvent::PointerUp);
            }
        }

        painter.rect_filled(rect, 0.0, Color32::from_gray(24));
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                rect,
                Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }

    fn tool_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tools");
        ui.horizontal(|ui| {
            if ui
                .selectable_label(self.editor.tool() == Tool::Select, "Select")
                .clicked()
            {
                self.editor.set_tool(Tool::Select);
            }
            if ui
                .selectable_label(self.editor.tool() == Tool::Draw, "Draw")
                .clicked()
            {
                self.editor.set_tool(Tool::Draw);
            }
        });

        ui.horizontal(|ui| {
            ui.label("Aspect:");
            for aspect in [AspectRatio::Square, AspectRatio::Portrait, AspectRatio::Landscape] {
                if ui
                    .selectable_label(self.editor.aspect() == aspect, aspect.label())
                    .clicked()
                {
                    self.editor.set_aspect(aspect);
                }
            }
        });
    }

    fn asset_section(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.heading("Assets");

        let base_images = self.manifest.base_images.clone();
        egui::ComboBox::from_label("Base image")
            .selected_text("Select…")
            .show_ui(ui, |ui| {
                for asset in &base_images {
                    if ui.selectable_label(false, &asset.name).clicked() {
                        let _ = self.editor.set_base_image(asset.source(&self.asset_root));
                    }
                }
            });

        let stickers = self.manifest.stickers.clone();
        egui::ComboBox::from_label("Sticker")
            .selected_text("Select…")
            .show_ui(ui, |ui| {
                for asset in &stickers {
                    if ui.selectable_label(false, &asset.name).clicked() {
                        let _ = self.editor.add_sticker_layer(asset.source(&self.asset_root));
                    }
                }
            });
    }

    fn text_section(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.heading("Text");
        ui.horizontal(|ui| {
            let edited = ui.text_edit_singleline(&mut self.text_input).changed();
            if edited {
                self.editor.edit_selected_text(&self.text_input);
            }
            if ui.button("Add").clicked() {
                let _ = self.editor.add_text_layer(&self.text_input);
            }
        });

        let fonts = self.manifest.fonts.clone();
        let mut restyle = false;
        egui::ComboBox::from_label("Font")
            .selected_text(self.editor.text_style.font.clone())
            .show_ui(ui, |ui| {
                for font in &fonts {
                    restyle |= ui
                        .selectable_value(
                            &mut self.editor.text_style.font,
                            font.family.clone(),
                            &font.name,
                        )
                        .changed();
                }
            });
        ui.horizontal(|ui| {
            ui.label("Size:");
            restyle |= ui
                .add(egui::Slider::new(&mut self.editor.text_style.size, 8.0..=256.0))
                .changed();
        });
        ui.horizontal(|ui| {
            ui.label("Fill:");
            restyle |= egui::color_picker::color_edit_button_srgba(
                ui,
                &mut self.editor.text_style.color,
                egui::color_picker::Alpha::Opaque,
            )
            .changed();
            ui.label("Outline:");
            restyle |= egui::color_picker::color_edit_button_srgba(
                ui,
                &mut self.editor.text_style.stroke,
                egui::color_picker::Alpha::Opaque,
            )
            .changed();
        });
        ui.horizontal(|ui| {
            ui.label("Align:");
            for (align, label) in [
                (TextAlign::Left, "Left"),
                (TextAlign::Center, "Center"),
                (TextAlign::Right, "Right"),
            ] {
                restyle |= ui
                    .selectable_value(&mut self.editor.text_style.align, align, label)
                    .changed();
            }
        });
        if restyle {
            self.editor.restyle_selected_text();
        }
    }

    fn draw_section(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.heading("Draw");
        ui.horizontal(|ui| {
            ui.label("Color:");
            egui::color_picker::color_edit_button_srgba(
                ui,
                &mut self.editor.brush.color,
                egui::color_picker::Alpha::Opaque,
            );
            ui.label("Width:");
            ui.add(egui::Slider::new(&mut self.editor.brush.width, 1.0..=50.0));
        });
    }

    fn layer_section(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.heading("Layers");

        // Topmost first, like the paint order reads on screen.
        let rows: Vec<(LayerId, String, bool)> = self
            .editor
            .store()
            .iter()
            .rev()
            .map(|layer| {
                let mut label = layer.kind().label().to_owned();
                if !layer.visible {
                    label.push_str(" (hidden)");
                }
                if layer.locked {
                    label.push_str(" (locked)");
                }
                (layer.id, label, Some(layer.id) == self.editor.store().selected())
            })
            .collect();
        for (id, label, selected) in rows {
            if ui.selectable_label(selected, label).clicked() {
                self.editor.select_layer(Some(id));
            }
        }

        ui.horizontal(|ui| {
            if ui.button("Up").clicked() {
                self.editor.reorder_selected(1);
            }
            if ui.button("Down").clicked() {
                self.editor.reorder_selected(-1);
            }
            if ui.button("Show/Hide").clicked() {
                self.editor.toggle_selected_visibility();
            }
            if ui.button("Delete").clicked() {
                self.editor.delete_selected();
            }
        });

        let Some((mut position, mut scale, mut rotation, mut opacity)) = self
            .editor
            .store()
            .selected_layer()
            .map(|layer| (layer.position, layer.scale(), layer.rotation, layer.opacity()))
        else {
            return;
        };

        let mut moved = false;
        ui.horizontal(|ui| {
            ui.label("X:");
            moved |= ui.add(egui::DragValue::new(&mut position.x)).changed();
            ui.label("Y:");
            moved |= ui.add(egui::DragValue::new(&mut position.y)).changed();
        });
        if moved {
            self.editor.set_selected_position(position);
        }
        ui.horizontal(|ui| {
            ui.label("Scale:");
            if ui
                .add(egui::Slider::new(&mut scale, 0.05..=5.0))
                .changed()
            {
                self.editor.set_selected_scale(scale);
            }
        });
        ui.horizontal(|ui| {
            ui.label("Rotation:");
            if ui
                .add(egui::Slider::new(&mut rotation, -180.0..=180.0))
                .changed()
            {
                self.editor.set_selected_rotation(rotation);
            }
        });
        ui.horizontal(|ui| {
            ui.label("Opacity:");
            if ui.add(egui::Slider::new(&mut opacity, 0.0..=1.0)).changed() {
                self.editor.set_selected_opacity(opacity);
            }
        });
    }

    fn history_section(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.editor.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                let _ = self.editor.undo();
            }
            if ui
                .add_enabled(self.editor.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                let _ = self.editor.redo();
            }
            if ui.button("Export PNG").clicked() {
                self.export();
            }
        });
    }

    fn export(&mut self) {
        let bytes = match self.editor.export_png() {
            Ok(bytes) => bytes,
            Err(_) => return,
        };
        match std::fs::write(&self.export_path, &bytes) {
            Ok(()) => {
                info!("exported {} bytes to {}", bytes.len(), self.export_path.display());
                self.editor
                    .set_status(format!("Saved {}.", self.export_path.display()));
            }
            Err(err) => {
                error!("failed to write export: {err}");
                self.editor.set_status("Failed to write export file.");
            }
        }
    }

    fn upload_texture(&mut self, ctx: &egui::Context) {
        let Some(image) = self.editor.render_if_dirty() else {
            return;
        };
        let size = [image.width() as usize, image.height() as usize];
        let color = ColorImage::from_rgba_unmultiplied(size, image.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(color, TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("composed-canvas", color, TextureOptions::NEAREST));
            }
        }
    }
}

impl eframe::App for StudioApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Resource completions rejoin the engine here, once per frame.
        self.editor.pump();
        self.translate_keys(ctx);
        self.close_guard(ctx);
        self.preview_file_drop(ctx);
        self.handle_dropped_files(ctx);

        egui::SidePanel::left("controls")
            .min_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.tool_section(ui);
                    self.asset_section(ui);
                    self.text_section(ui);
                    self.draw_section(ui);
                    self.layer_section(ui);
                    self.history_section(ui);
                });
            });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(self.editor.status());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas_ui(ui);
        });

        self.upload_texture(ctx);

        // Keep frames coming while loads are in flight so their completions
        // get pumped promptly.
        if self.editor.loads_in_flight() > 0 {
            ctx.request_repaint();
        }
    }
}
