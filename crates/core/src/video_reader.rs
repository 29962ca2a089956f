use crate::error::ExtractError;
use crate::metadata::{normalize, MetadataSource, PartialMetadata};
use chrono::Local;
use nom_exif::{EntryValue, MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use std::path::Path;

/// Reads track metadata from a video container (MP4, MOV, 3GP).
///
/// A file whose container is not recognized is reported as having no
/// metadata so that it can still be renamed by its file timestamp.
pub fn read_video_metadata(path: &Path) -> Result<Option<PartialMetadata>, ExtractError> {
    let source = match MediaSource::file_path(path) {
        Ok(source) => source,
        Err(nom_exif::Error::UnrecognizedFileFormat) => {
            log::warn!(
                "{} looks like a video file, but its container cannot be read",
                path.display()
            );
            return Ok(None);
        }
        Err(source) => {
            return Err(ExtractError::Container {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if !source.has_track() {
        return Ok(None);
    }

    let mut parser = MediaParser::new();
    let info: TrackInfo = parser
        .parse(source)
        .map_err(|source| ExtractError::Container {
            path: path.to_path_buf(),
            source,
        })?;

    let date = info
        .get(TrackInfoTag::CreateDate)
        .and_then(|v| v.as_time())
        // QuickTime writes 1904-01-01 when the clock was never set.
        .filter(|t| t.timestamp() > 0)
        .map(|t| t.with_timezone(&Local).naive_local());

    let partial = PartialMetadata {
        source: date.map(|_| MetadataSource::VideoTrack),
        date,
        artist: None,
        make: normalize(text(info.get(TrackInfoTag::Make))),
        model: normalize(text(info.get(TrackInfoTag::Model))),
        height: info.get(TrackInfoTag::ImageHeight).and_then(unsigned),
    };

    if partial.is_empty() {
        return Ok(None);
    }
    Ok(Some(partial))
}

fn text(value: Option<&EntryValue>) -> Option<String> {
    match value? {
        EntryValue::Text(s) => Some(s.clone()),
        _ => None,
    }
}

fn unsigned(value: &EntryValue) -> Option<u32> {
    let height = match value {
        EntryValue::U16(v) => Some(u32::from(*v)),
        EntryValue::U32(v) => Some(*v),
        EntryValue::U64(v) => u32::try_from(*v).ok(),
        _ => None,
    };
    height.filter(|h| *h > 0)
}
