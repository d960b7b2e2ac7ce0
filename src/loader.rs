//! Asynchronous acquisition of decoded image resources.
//!
//! The editor itself is single-threaded; decoding is the one operation that
//! leaves that thread. [`ResourceBroker`] runs each load on a worker thread
//! and the result rejoins the engine through a channel that the editor drains
//! between input events. While a load is in flight the owning layer stays in
//! the store but is skipped by the paint routine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use image::RgbaImage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// A loadable reference to image data. This is what snapshots persist; the
/// decoded pixels are reconstructed from it on restore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSource {
    /// An image file on disk (asset-provider entries, user-chosen files).
    Path(PathBuf),
    /// Raw encoded bytes (uploads that never touched the filesystem).
    Memory(Vec<u8>),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Memory(bytes) => format!("<memory: {} bytes>", bytes.len()),
        }
    }
}

/// A decoded, paintable image. Shared between layers via `Arc` so duplicating
/// a layer never re-decodes.
pub struct ImageResource {
    pixels: RgbaImage,
}

impl ImageResource {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl std::fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResource")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Resolves an [`ImageSource`] to decoded pixels. Implementations run on a
/// worker thread, so they may block.
pub trait ImageLoader: Send + Sync {
    fn load(&self, source: &ImageSource) -> Result<Arc<ImageResource>, LoadError>;
}

/// The production loader: reads files, decodes with the `image` crate, and
/// memoizes decoded sources so restores and duplicates don't decode twice.
#[derive(Default)]
pub struct DecodingLoader {
    cache: Mutex<HashMap<ImageSource, Arc<ImageResource>>>,
}

impl DecodingLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageLoader for DecodingLoader {
    fn load(&self, source: &ImageSource) -> Result<Arc<ImageResource>, LoadError> {
        if let Some(hit) = self.cache.lock().get(source) {
            return Ok(Arc::clone(hit));
        }

        let decoded = match source {
            ImageSource::Path(path) => {
                let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                image::load_from_memory(&bytes)?
            }
            ImageSource::Memory(bytes) => image::load_from_memory(bytes)?,
        };

        let resource = Arc::new(ImageResource::new(decoded.to_rgba8()));
        self.cache
            .lock()
            .insert(source.clone(), Arc::clone(&resource));
        Ok(resource)
    }
}

/// Identifies one in-flight load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// A finished load, delivered on the engine thread.
pub struct LoadCompletion {
    pub token: RequestToken,
    pub result: Result<Arc<ImageResource>, LoadError>,
}

/// Dispatches loads to worker threads and funnels completions back through a
/// channel drained by the editor. There is no cancellation of the work
/// itself; the editor drops the token of a superseded request and discards
/// its completion on arrival.
pub struct ResourceBroker {
    loader: Arc<dyn ImageLoader>,
    tx: UnboundedSender<LoadCompletion>,
    rx: UnboundedReceiver<LoadCompletion>,
    next_token: u64,
}

impl ResourceBroker {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            loader,
            tx,
            rx,
            next_token: 1,
        }
    }

    /// Start loading `source` off-thread. Returns the token the completion
    /// will carry.
    pub fn request(&mut self, source: ImageSource) -> RequestToken {
        let token = RequestToken(self.next_token);
        self.next_token += 1;

        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = loader.load(&source);
            // The receiver only disappears when the editor is gone.
            let _ = tx.unbounded_send(LoadCompletion { token, result });
        });
        token
    }

    /// Drain every completion that has already arrived, without blocking.
    pub fn poll(&mut self) -> Vec<LoadCompletion> {
        let mut done = Vec::new();
        while let Ok(Some(completion)) = self.rx.try_next() {
            done.push(completion);
        }
        done
    }

    /// Block until the next completion arrives. Used when the caller needs a
    /// restore or export to settle before continuing.
    pub fn recv_blocking(&mut self) -> Option<LoadCompletion> {
        futures::executor::block_on(self.rx.next())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use image::Rgba;

    /// Deterministic loader for tests: yields a solid-color image whose size
    /// is encoded in the constructor, or a failure for every request.
    pub struct SolidLoader {
        pub width: u32,
        pub height: u32,
        pub color: [u8; 4],
        pub fail: bool,
    }

    impl SolidLoader {
        pub fn sized(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                color: [255, 0, 0, 255],
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                width: 0,
                height: 0,
                color: [0; 4],
                fail: true,
            }
        }
    }

    impl ImageLoader for SolidLoader {
        fn load(&self, source: &ImageSource) -> Result<Arc<ImageResource>, LoadError> {
            if self.fail {
                return Err(LoadError::Io {
                    path: source.describe(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            let pixels = RgbaImage::from_pixel(self.width, self.height, Rgba(self.color));
            Ok(Arc::new(ImageResource::new(pixels)))
        }
    }
}
