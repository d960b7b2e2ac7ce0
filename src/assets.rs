//! The asset provider boundary: a JSON manifest of selectable base images,
//! stickers and fonts, loaded once at startup and treated as read-only.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::EditorContext;
use crate::loader::ImageSource;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A selectable base image or sticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub name: String,
    pub src: String,
}

impl ImageAsset {
    /// The asset's loadable source, resolved against the asset root.
    pub fn source(&self, root: &Path) -> ImageSource {
        ImageSource::Path(root.join(&self.src))
    }
}

/// A selectable typeface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontAsset {
    pub name: String,
    pub family: String,
    pub src: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetManifest {
    pub base_images: Vec<ImageAsset>,
    pub stickers: Vec<ImageAsset>,
    pub fonts: Vec<FontAsset>,
}

impl AssetManifest {
    pub fn from_reader(reader: impl Read) -> Result<Self, ManifestError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Register every listed font with the editor. A font file that fails to
    /// read or parse is skipped; text measurement falls back for that
    /// family. Returns the number registered.
    pub fn register_fonts(&self, root: &Path, editor: &mut EditorContext) -> usize {
        let mut registered = 0;
        for font in &self.fonts {
            let path: PathBuf = root.join(&font.src);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    if editor.register_font(&font.family, bytes) {
                        registered += 1;
                    }
                }
                Err(err) => {
                    warn!("failed to read font {}: {err}", path.display());
                }
            }
        }
        info!("registered {registered}/{} fonts", self.fonts.len());
        registered
    }
}
