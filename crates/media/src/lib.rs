//! Media materialization: size-capped downloads, content-addressed caching,
//! lazy at-most-once fetching, temp-file lifecycle.

pub mod download;
pub mod error;
pub mod image_ops;
pub mod lazy;

pub use {
    download::{TempMedia, download_image, download_media},
    error::{Error, Result},
    lazy::{LazyMedia, MediaSource},
};
