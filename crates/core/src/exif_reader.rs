use crate::error::ExtractError;
use crate::metadata::{normalize, MetadataSource, PartialMetadata};
use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Capture time first, then digitized, then the last-modified tag.
const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];
const HEIGHT_TAGS: &[Tag] = &[Tag::PixelYDimension, Tag::ImageLength];

/// Reads EXIF from a still image container (JPEG, HEIF, TIFF, PNG, WebP).
///
/// Returns `Ok(None)` when the file is a readable image without any usable
/// metadata. The pixel height is taken from the image header when EXIF does
/// not carry it.
pub fn read_exif_metadata(path: &Path) -> Result<Option<PartialMetadata>, ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buf = BufReader::new(file);

    let mut partial = match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => from_exif(&exif),
        Err(exif::Error::NotFound(_)) => {
            log::debug!("no EXIF block in {}", path.display());
            PartialMetadata::default()
        }
        Err(source) => {
            return Err(ExtractError::Exif {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if partial.height.is_none() {
        partial.height = header_height(path);
    }

    if partial.is_empty() {
        return Ok(None);
    }
    Ok(Some(partial))
}

fn from_exif(exif: &exif::Exif) -> PartialMetadata {
    let date = DATE_TAGS
        .iter()
        .filter_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .find_map(|field| parse_date(&field.value));

    let height = HEIGHT_TAGS
        .iter()
        .filter_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .find_map(|field| field.value.get_uint(0))
        .filter(|h| *h > 0);

    PartialMetadata {
        source: date.map(|_| MetadataSource::Exif),
        date,
        artist: ascii_value(exif, Tag::Artist),
        make: ascii_value(exif, Tag::Make),
        model: ascii_value(exif, Tag::Model),
        height,
    }
}

fn ascii_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => normalize(
            parts
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        ),
        _ => None,
    }
}

fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    let Value::Ascii(parts) = value else {
        return None;
    };
    let raw = parts.first()?;
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(
            u32::from(dt.hour),
            u32::from(dt.minute),
            u32::from(dt.second),
        )
}

fn header_height(path: &Path) -> Option<u32> {
    match imagesize::size(path) {
        Ok(dim) => u32::try_from(dim.height).ok().filter(|h| *h > 0),
        Err(err) => {
            log::debug!("cannot read image dimensions for {}: {}", path.display(), err);
            None
        }
    }
}
