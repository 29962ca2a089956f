use crate::error::ExtractError;
use crate::exif_reader::read_exif_metadata;
use crate::metadata::PartialMetadata;
use crate::video_reader::read_video_metadata;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "heif", "tif", "tiff", "png", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Source of per-file metadata.
///
/// `Ok(None)` means the file carries no usable metadata and the caller
/// should fall back to filesystem timestamps.
pub trait MetadataReader {
    fn read(&self, path: &Path) -> Result<Option<PartialMetadata>, ExtractError>;
}

/// Reads EXIF from still images and track headers from video containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaMetadataReader;

impl MetadataReader for MediaMetadataReader {
    fn read(&self, path: &Path) -> Result<Option<PartialMetadata>, ExtractError> {
        match media_kind(path) {
            Some(MediaKind::Image) => read_exif_metadata(path),
            Some(MediaKind::Video) => read_video_metadata(path),
            None => Ok(None),
        }
    }
}

pub fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

pub fn is_media_file(path: &Path) -> bool {
    media_kind(path).is_some()
}

/// Earliest of the creation and modification times the platform exposes,
/// in local time.
pub fn filesystem_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let meta = fs::metadata(path).ok()?;
    let earliest = [meta.created().ok(), meta.modified().ok()]
        .into_iter()
        .flatten()
        .min()?;
    Some(to_local(earliest))
}

fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}
