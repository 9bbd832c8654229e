//! Error type shared by loaders, the image codec bridge and configuration

use std::path::PathBuf;

pub type RasterResult<T> = Result<T, RasterError>;

#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode {}: {}", .path.display(), .source)]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode {}: {}", .path.display(), .source)]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("line {line}: face has {corners} corners, the model must be triangulated")]
    MalformedFace { line: usize, corners: usize },

    #[error("parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("serialize error: {0}")]
    ConfigSerialize(#[from] ron::Error),
}
