use std::io::Cursor;

use nom_exif::{EntryValue, Exif, ExifIter, LatLng, MediaParser, MediaSource};

use crate::error::SaveError;
use crate::metadata::{MetaDict, MetaValue, NS_EXIF, NS_GPS, NS_TIFF};

use super::tags::{
    TagKind, TagSpec, EXIF_TAGS, TAG_GPS_ALTITUDE, TAG_GPS_ALTITUDE_REF, TAG_GPS_DATESTAMP,
    TAG_GPS_IMG_DIRECTION, TAG_GPS_IMG_DIRECTION_REF, TAG_GPS_TIMESTAMP, TIFF_TAGS,
};

/// Extract the metadata dictionary from a raw JPEG byte stream.
///
/// The stream must decode as an image — a stream with no pixel source is an
/// error. A decodable image without EXIF yields an empty dictionary; the
/// merge treats missing metadata as empty, never as a failure.
pub fn extract_metadata(bytes: &[u8]) -> Result<MetaDict, SaveError> {
    // No pixel source means there is nothing to re-encode later either.
    image::load_from_memory(bytes).map_err(|e| SaveError::MetadataExtraction(e.to_string()))?;

    let mut parser = MediaParser::new();
    let ms = match MediaSource::seekable(Cursor::new(bytes.to_vec())) {
        Ok(ms) => ms,
        Err(e) => {
            log::debug!("media source not recognized for metadata: {e}");
            return Ok(MetaDict::new());
        }
    };

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(e) => {
            log::debug!("no EXIF data found: {e}");
            return Ok(MetaDict::new());
        }
    };

    // GPS first; converting the iterator into `Exif` consumes it.
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let mut dict = MetaDict::new();

    let tiff = collect_namespace(&exif, TIFF_TAGS);
    if !tiff.is_empty() {
        dict.insert(NS_TIFF.into(), MetaValue::Dict(tiff));
    }

    let exif_dict = collect_namespace(&exif, EXIF_TAGS);
    if !exif_dict.is_empty() {
        dict.insert(NS_EXIF.into(), MetaValue::Dict(exif_dict));
    }

    if let Some(gps) = gps_info {
        let mut block = MetaDict::new();
        block.insert(
            "Latitude".into(),
            MetaValue::Float(latlng_to_decimal(&gps.latitude)),
        );
        block.insert("LatitudeRef".into(), gps.latitude_ref.to_string().into());
        block.insert(
            "Longitude".into(),
            MetaValue::Float(latlng_to_decimal(&gps.longitude)),
        );
        block.insert("LongitudeRef".into(), gps.longitude_ref.to_string().into());

        // The rest of the GPS IFD: altitude, timestamps, direction.
        if let Some(altitude) = gps_tag_float(&exif, TAG_GPS_ALTITUDE) {
            block.insert("Altitude".into(), MetaValue::Int(altitude.trunc() as i64));
        }
        if let Some(altitude_ref) = gps_tag_int(&exif, TAG_GPS_ALTITUDE_REF) {
            block.insert("AltitudeRef".into(), MetaValue::Int(altitude_ref));
        }
        if let Some(date) = gps_tag_text(&exif, TAG_GPS_DATESTAMP) {
            block.insert("DateStamp".into(), date.into());
        }
        if let Some(time) = exif
            .get_by_ifd_tag_code(0, TAG_GPS_TIMESTAMP)
            .and_then(timestamp_text)
        {
            block.insert("TimeStamp".into(), time.into());
        }
        if let Some(direction) = gps_tag_float(&exif, TAG_GPS_IMG_DIRECTION) {
            block.insert("ImgDirection".into(), MetaValue::Float(direction));
        }
        if let Some(direction_ref) = gps_tag_text(&exif, TAG_GPS_IMG_DIRECTION_REF) {
            block.insert("ImgDirectionRef".into(), direction_ref.into());
        }

        dict.insert(NS_GPS.into(), MetaValue::Dict(block));
    }

    Ok(dict)
}

fn collect_namespace(exif: &Exif, specs: &[TagSpec]) -> MetaDict {
    let mut dict = MetaDict::new();
    for spec in specs {
        if let Some(val) = exif.get_by_ifd_tag_code(0, spec.code) {
            match entry_to_meta(spec.kind, val) {
                Some(meta) => {
                    dict.insert(spec.name.to_string(), meta);
                }
                None => log::debug!("skipping unreadable value for {}", spec.name),
            }
        }
    }
    dict
}

/// Convert a parsed entry into a dictionary value of the declared family.
/// Values that don't parse into the family are kept as text rather than lost.
fn entry_to_meta(kind: TagKind, val: &EntryValue) -> Option<MetaValue> {
    let text = val.to_string();
    let text = text.trim().trim_matches('"').trim_end_matches('\0').trim();
    if text.is_empty() {
        return None;
    }

    match kind {
        TagKind::Text => Some(MetaValue::Text(text.to_string())),
        TagKind::Int => text
            .parse::<i64>()
            .ok()
            .map(MetaValue::Int)
            .or_else(|| Some(MetaValue::Text(text.to_string()))),
        TagKind::Rational => parse_rational_text(text)
            .map(MetaValue::Float)
            .or_else(|| Some(MetaValue::Text(text.to_string()))),
    }
}

fn gps_tag_text(exif: &Exif, code: u16) -> Option<String> {
    let text = exif.get_by_ifd_tag_code(0, code)?.to_string();
    let text = text.trim().trim_matches('"').trim_end_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn gps_tag_float(exif: &Exif, code: u16) -> Option<f64> {
    gps_tag_text(exif, code).as_deref().and_then(parse_rational_text)
}

fn gps_tag_int(exif: &Exif, code: u16) -> Option<i64> {
    gps_tag_text(exif, code).and_then(|t| t.parse().ok())
}

/// GPSTimeStamp arrives as three rationals; render them back to the
/// `HH:mm:ss.ffffff` form the dictionary carries.
fn timestamp_text(val: &EntryValue) -> Option<String> {
    let text = val.to_string();
    let rationals: Vec<f64> = text
        .split(|c: char| !(c.is_ascii_digit() || c == '/' || c == '.'))
        .filter(|t| !t.is_empty())
        .filter_map(parse_rational_text)
        .collect();
    match rationals.as_slice() {
        [h, m, s] => Some(format!("{:02}:{:02}:{:09.6}", *h as u32, *m as u32, s)),
        _ => None,
    }
}

/// Parse a rational rendered as text: either a plain decimal or `num/den`.
/// Trailing annotations after whitespace (units, decimal hints) are ignored.
pub(super) fn parse_rational_text(text: &str) -> Option<f64> {
    let token = text.split_whitespace().next()?;
    if let Some((num, den)) = token.split_once('/') {
        let num = num.trim().parse::<f64>().ok()?;
        let den = den.trim().parse::<f64>().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    token.parse::<f64>().ok()
}

/// Convert a LatLng (3 unsigned rationals: deg, min, sec) to decimal degrees.
/// The hemisphere sign is carried by the reference field, not the value.
fn latlng_to_decimal(latlng: &LatLng) -> f64 {
    let degrees = latlng.0 .0 as f64 / latlng.0 .1 as f64;
    let minutes = latlng.1 .0 as f64 / latlng.1 .1 as f64;
    let seconds = latlng.2 .0 as f64 / latlng.2 .1 as f64;

    degrees + minutes / 60.0 + seconds / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn plain_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, image::Rgb([120, 80, 40])));
        let mut bytes = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 100);
        encoder.encode_image(&img).unwrap();
        bytes
    }

    #[test]
    fn garbage_bytes_are_an_extraction_error() {
        let err = extract_metadata(b"not an image at all").unwrap_err();
        assert!(matches!(err, SaveError::MetadataExtraction(_)));
    }

    #[test]
    fn jpeg_without_exif_yields_empty_dictionary() {
        let dict = extract_metadata(&plain_jpeg()).unwrap();
        assert!(dict.is_empty());
    }

    #[test]
    fn rational_text_plain_decimal() {
        assert_eq!(parse_rational_text("72"), Some(72.0));
        assert_eq!(parse_rational_text("2.8"), Some(2.8));
    }

    #[test]
    fn rational_text_fraction() {
        assert_eq!(parse_rational_text("1/200"), Some(0.005));
        assert_eq!(parse_rational_text("1/200 (0.005)"), Some(0.005));
        assert_eq!(parse_rational_text("1/0"), None);
    }
}
