use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("font file {} is not a usable TrueType/OpenType font", path.display())]
    FontLoad { path: PathBuf },
    /// A user id could not be converted into the numeric id the avatar
    /// fetcher works with.
    #[error("user id '{user_id}' is not numeric: {source}")]
    InvalidUserId {
        user_id: String,
        #[source]
        source: ParseIntError,
    },
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}
