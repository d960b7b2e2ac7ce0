use std::sync::Arc;

use egui::{pos2, Pos2};
use image::RgbaImage;
use meme_studio::canvas::AspectRatio;
use meme_studio::error::{EditorError, LoadError};
use meme_studio::input::InputEvent;
use meme_studio::layer::{LayerId, LayerKind};
use meme_studio::loader::{ImageLoader, ImageResource, ImageSource};
use meme_studio::{CanvasSize, EditorContext};

struct SolidLoader;

impl ImageLoader for SolidLoader {
    fn load(&self, _source: &ImageSource) -> Result<Arc<ImageResource>, LoadError> {
        Ok(Arc::new(ImageResource::new(RgbaImage::from_pixel(
            80,
            80,
            image::Rgba([10, 120, 10, 255]),
        ))))
    }
}

fn editor() -> EditorContext {
    EditorContext::new(Arc::new(SolidLoader))
}

/// Everything observable that a snapshot restores: layer order with
/// per-layer presentation, canvas size and the selection.
fn fingerprint(editor: &EditorContext) -> (Vec<(LayerId, LayerKind, Pos2, bool)>, CanvasSize, Option<LayerId>) {
    let layers = editor
        .store()
        .iter()
        .map(|layer| (layer.id, layer.kind(), layer.position, layer.visible))
        .collect();
    (layers, editor.canvas(), editor.store().selected())
}

#[test]
fn test_thirty_mutations_unwind_to_the_initial_document() {
    let mut editor = editor();
    let mut states = vec![fingerprint(&editor)];

    // Thirty discrete operations, cycling through layer creation, aspect
    // changes and visibility toggles. Thirty is exactly the history depth,
    // so every step back to the empty document stays reachable.
    for i in 0..30 {
        match i % 3 {
            0 => {
                editor.add_text_layer(&format!("line {i}")).unwrap();
            }
            1 => {
                let aspect = if i % 2 == 0 {
                    AspectRatio::Landscape
                } else {
                    AspectRatio::Portrait
                };
                editor.set_aspect(aspect);
            }
            _ => {
                editor.toggle_selected_visibility();
            }
        }
        states.push(fingerprint(&editor));
    }

    for expected in states.iter().rev().skip(1) {
        editor.undo().unwrap();
        editor.wait_for_loads();
        assert_eq!(&fingerprint(&editor), expected);
    }
    assert_eq!(editor.undo(), Err(EditorError::NothingToUndo));
    assert!(editor.store().is_empty());
}

#[test]
fn test_redo_is_exact_and_cleared_by_new_mutations() {
    let mut editor = editor();
    editor.add_text_layer("first").unwrap();
    editor.add_text_layer("second").unwrap();
    let full = fingerprint(&editor);

    editor.undo().unwrap();
    editor.wait_for_loads();
    assert_eq!(editor.store().len(), 1);

    editor.redo().unwrap();
    editor.wait_for_loads();
    assert_eq!(fingerprint(&editor), full);

    editor.undo().unwrap();
    editor.wait_for_loads();
    editor.add_text_layer("branch").unwrap();
    assert!(!editor.can_redo());
    assert_eq!(editor.redo(), Err(EditorError::NothingToRedo));
}

#[test]
fn test_whole_drag_is_a_single_undo_step() {
    let mut editor = editor();
    let sticker = editor.add_sticker_layer(ImageSource::Memory(vec![1])).unwrap();
    editor.wait_for_loads();

    // Many pointer samples, one gesture.
    editor.handle_event(InputEvent::PointerDown(pos2(65.0, 65.0)));
    for step in 1..=10 {
        let offset = step as f32 * 5.0;
        editor.handle_event(InputEvent::PointerMove(pos2(65.0 + offset, 65.0 + offset)));
    }
    editor.handle_event(InputEvent::PointerUp);
    assert_eq!(
        editor.store().get(sticker).unwrap().position,
        pos2(110.0, 110.0)
    );

    // One undo rewinds the whole gesture, not one sample.
    editor.undo().unwrap();
    editor.wait_for_loads();
    assert_eq!(
        editor.store().get(sticker).unwrap().position,
        pos2(60.0, 60.0)
    );

    editor.redo().unwrap();
    editor.wait_for_loads();
    assert_eq!(
        editor.store().get(sticker).unwrap().position,
        pos2(110.0, 110.0)
    );
}

#[test]
fn test_restore_reacquires_resources() {
    let mut editor = editor();
    let sticker = editor.add_sticker_layer(ImageSource::Memory(vec![1])).unwrap();
    editor.wait_for_loads();
    let before = editor.render_now();

    editor.add_text_layer("scratch").unwrap();
    editor.undo().unwrap();
    // The store is empty while the restore's loads are in flight.
    assert!(editor.restore_in_progress());
    editor.wait_for_loads();
    assert!(!editor.restore_in_progress());

    let restored = editor.store().get(sticker).unwrap();
    assert!(restored.resource.is_some());
    assert_eq!(before.as_raw(), editor.render_now().as_raw());
}
