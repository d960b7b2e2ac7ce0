use thiserror::Error;

/// Errors surfaced by editor operations.
///
/// None of these are fatal: every operation that fails leaves the document
/// unchanged and reports a short status message to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Layer limit reached ({0} max). Delete layers to add more.")]
    CapacityExceeded(usize),
    #[error("Failed to load image resource.")]
    ResourceLoadFailed,
    #[error("Text cannot be empty.")]
    EmptyInput,
    #[error("Nothing to undo.")]
    NothingToUndo,
    #[error("Nothing to redo.")]
    NothingToRedo,
    #[error("Canvas is empty. Add a layer before export.")]
    ExportPreconditionFailed,
    #[error("Failed to encode PNG.")]
    ExportFailed,
}

/// Errors produced while fetching or decoding an image source.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}
