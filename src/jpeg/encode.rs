use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;

use crate::error::SaveError;
use crate::metadata::{MetaDict, MetaValue, NS_EXIF, NS_GPS, NS_TIFF};

use super::extract::parse_rational_text;
use super::tags::*;

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

// TIFF data formats
const FMT_BYTE: u16 = 1;
const FMT_ASCII: u16 = 2;
const FMT_SHORT: u16 = 3;
const FMT_LONG: u16 = 4;
const FMT_RATIONAL: u16 = 5;

/// Serialize the pixel buffer and merged metadata into a final JPEG stream.
///
/// Produces exactly one frame. The pixels are encoded at the given quality,
/// the dictionary is serialized to an EXIF TIFF payload, and the payload is
/// embedded as the APP1 segment. On failure nothing is returned: there is no
/// partial output and no global state is touched.
pub fn reencode(
    pixels: &DynamicImage,
    metadata: &MetaDict,
    quality: u8,
) -> Result<Vec<u8>, SaveError> {
    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
    encoder
        .encode_image(pixels)
        .map_err(|e| SaveError::Finalize(e.to_string()))?;

    let mut jpeg = Jpeg::from_bytes(Bytes::from(encoded))
        .map_err(|e| SaveError::DestinationCreation(e.to_string()))?;

    if let Some(tiff_data) = build_exif_payload(metadata) {
        jpeg.set_exif(Some(Bytes::from(tiff_data)));
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

/// Serialize the dictionary into raw EXIF TIFF data, or None when the
/// dictionary carries nothing embeddable.
///
/// IFD0 goes through little_exif; the Exif and GPS sub-IFDs are assembled as
/// raw IFDs and spliced into the TIFF afterward, since little_exif drops
/// sub-IFD tags created via `from_u16_with_data`.
fn build_exif_payload(metadata: &MetaDict) -> Option<Vec<u8>> {
    let mut ifd0 = Metadata::new();
    let ifd0_count = metadata
        .get(NS_TIFF)
        .and_then(MetaValue::as_dict)
        .map(|d| collect_ifd0_tags(&mut ifd0, d))
        .unwrap_or(0);

    let base = if ifd0_count > 0 {
        let exif_bytes = ifd0.as_u8_vec(FileExtension::JPEG);
        if exif_bytes.len() > JPEG_EXIF_OVERHEAD {
            exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec()
        } else {
            empty_tiff()
        }
    } else {
        empty_tiff()
    };

    let big_endian = if base.starts_with(b"MM") {
        true
    } else if base.starts_with(b"II") {
        false
    } else {
        log::debug!("serialized payload is not a TIFF, dropping metadata");
        return None;
    };

    let exif_entries = metadata
        .get(NS_EXIF)
        .and_then(MetaValue::as_dict)
        .map(|d| collect_sub_entries(d, EXIF_TAGS, big_endian))
        .unwrap_or_default();
    let gps_entries = metadata
        .get(NS_GPS)
        .and_then(MetaValue::as_dict)
        .map(|d| collect_gps_entries(d, big_endian))
        .unwrap_or_default();

    if ifd0_count == 0 && exif_entries.is_empty() && gps_entries.is_empty() {
        return None;
    }
    if exif_entries.is_empty() && gps_entries.is_empty() {
        return Some(base);
    }
    append_sub_ifds(base, &exif_entries, &gps_entries, big_endian)
}

/// Encode the recognized IFD0 tags through little_exif.
fn collect_ifd0_tags(exif: &mut Metadata, dict: &MetaDict) -> usize {
    let mut count = 0;
    for spec in TIFF_TAGS {
        let Some(value) = dict.get(spec.name) else {
            continue;
        };
        let encoded = match spec.kind {
            TagKind::Text => value_to_text(value)
                .map(|s| (ExifTagFormat::STRING, format!("{s}\0").into_bytes())),
            TagKind::Int => match value_to_int(value).map(u16::try_from) {
                Some(Ok(i)) => Some((ExifTagFormat::INT16U, i.to_le_bytes().to_vec())),
                _ => None,
            },
            TagKind::Rational => value_to_float(value).map(|f| {
                let (num, den) = float_to_rational(f);
                let mut bytes = num.to_le_bytes().to_vec();
                bytes.extend_from_slice(&den.to_le_bytes());
                (ExifTagFormat::RATIONAL64U, bytes)
            }),
        };
        let Some((format, data)) = encoded else {
            log::debug!("skipping unencodable value for {}", spec.name);
            continue;
        };
        if let Ok(tag) =
            ExifTag::from_u16_with_data(spec.code, &format, &data, &Endian::Little, &ExifTagGroup::IFD0)
        {
            exif.set_tag(tag);
            count += 1;
        }
    }
    count
}

/// A raw IFD entry, value data already in the payload's endianness.
struct RawIfdEntry {
    tag_id: u16,
    data_format: u16,
    count: u32,
    inline_value: [u8; 4], // value if it fits in 4 bytes
    extra_data: Option<Vec<u8>>, // data if > 4 bytes
}

fn enc_u16(val: u16, big_endian: bool) -> [u8; 2] {
    if big_endian { val.to_be_bytes() } else { val.to_le_bytes() }
}

fn enc_u32(val: u32, big_endian: bool) -> [u8; 4] {
    if big_endian { val.to_be_bytes() } else { val.to_le_bytes() }
}

fn ascii_entry(tag_id: u16, value: &str) -> RawIfdEntry {
    let mut data = value.as_bytes().to_vec();
    data.push(0); // null terminator
    let count = data.len() as u32;

    let (inline_value, extra_data) = if data.len() <= 4 {
        let mut inline = [0u8; 4];
        inline[..data.len()].copy_from_slice(&data);
        (inline, None)
    } else {
        ([0u8; 4], Some(data))
    };

    RawIfdEntry { tag_id, data_format: FMT_ASCII, count, inline_value, extra_data }
}

fn short_entry(tag_id: u16, value: u16, big_endian: bool) -> RawIfdEntry {
    let mut inline = [0u8; 4];
    inline[..2].copy_from_slice(&enc_u16(value, big_endian));
    RawIfdEntry { tag_id, data_format: FMT_SHORT, count: 1, inline_value: inline, extra_data: None }
}

fn byte_entry(tag_id: u16, value: u8) -> RawIfdEntry {
    RawIfdEntry {
        tag_id,
        data_format: FMT_BYTE,
        count: 1,
        inline_value: [value, 0, 0, 0],
        extra_data: None,
    }
}

fn long_entry(tag_id: u16, value: u32, big_endian: bool) -> RawIfdEntry {
    RawIfdEntry {
        tag_id,
        data_format: FMT_LONG,
        count: 1,
        inline_value: enc_u32(value, big_endian),
        extra_data: None,
    }
}

fn rational_entry(tag_id: u16, rationals: &[(u32, u32)], big_endian: bool) -> RawIfdEntry {
    let mut data = Vec::with_capacity(rationals.len() * 8);
    for (num, den) in rationals {
        data.extend_from_slice(&enc_u32(*num, big_endian));
        data.extend_from_slice(&enc_u32(*den, big_endian));
    }
    RawIfdEntry {
        tag_id,
        data_format: FMT_RATIONAL,
        count: rationals.len() as u32,
        inline_value: [0u8; 4],
        extra_data: Some(data),
    }
}

/// Encode the recognized tags of one sub-IFD namespace as raw entries.
fn collect_sub_entries(dict: &MetaDict, specs: &[TagSpec], big_endian: bool) -> Vec<RawIfdEntry> {
    let mut entries = Vec::new();
    for spec in specs {
        let Some(value) = dict.get(spec.name) else {
            continue;
        };
        let entry = match spec.kind {
            TagKind::Text => value_to_text(value).map(|s| ascii_entry(spec.code, &s)),
            TagKind::Int => match value_to_int(value).map(u16::try_from) {
                Some(Ok(i)) => Some(short_entry(spec.code, i, big_endian)),
                _ => None,
            },
            TagKind::Rational => value_to_float(value)
                .map(|f| rational_entry(spec.code, &[float_to_rational(f)], big_endian)),
        };
        match entry {
            Some(e) => entries.push(e),
            None => log::debug!("skipping unencodable value for {}", spec.name),
        }
    }
    entries
}

/// Encode the GPS block as raw GPS-IFD entries. Decimal degrees become
/// degree/minute/second rationals at this boundary only.
fn collect_gps_entries(gps: &MetaDict, big_endian: bool) -> Vec<RawIfdEntry> {
    let mut entries = Vec::new();

    if let Some(lat) = gps.get("Latitude").and_then(value_to_float) {
        entries.push(rational_entry(TAG_GPS_LATITUDE, &dms_rationals(lat), big_endian));
    }
    if let Some(r) = gps.get("LatitudeRef").and_then(value_to_text) {
        entries.push(ascii_entry(TAG_GPS_LATITUDE_REF, &r));
    }
    if let Some(lon) = gps.get("Longitude").and_then(value_to_float) {
        entries.push(rational_entry(TAG_GPS_LONGITUDE, &dms_rationals(lon), big_endian));
    }
    if let Some(r) = gps.get("LongitudeRef").and_then(value_to_text) {
        entries.push(ascii_entry(TAG_GPS_LONGITUDE_REF, &r));
    }
    if let Some(altitude) = gps.get("Altitude").and_then(value_to_float) {
        entries.push(rational_entry(
            TAG_GPS_ALTITUDE,
            &[(altitude.abs() as u32, 1)],
            big_endian,
        ));
    }
    if let Some(altitude_ref) = gps.get("AltitudeRef").and_then(value_to_int) {
        entries.push(byte_entry(TAG_GPS_ALTITUDE_REF, altitude_ref as u8));
    }
    if let Some(time) = gps.get("TimeStamp").and_then(value_to_text) {
        if let Some(r) = time_rationals(&time) {
            entries.push(rational_entry(TAG_GPS_TIMESTAMP, &r, big_endian));
        }
    }
    if let Some(date) = gps.get("DateStamp").and_then(value_to_text) {
        entries.push(ascii_entry(TAG_GPS_DATESTAMP, &date));
    }
    if let Some(direction) = gps.get("ImgDirection").and_then(value_to_float) {
        // The unsigned rational cannot carry a negative heading; the raw
        // value still lives in the dictionary.
        if direction < 0.0 {
            log::debug!("skipping negative image direction {direction}");
        } else {
            entries.push(rational_entry(
                TAG_GPS_IMG_DIRECTION,
                &[float_to_rational(direction)],
                big_endian,
            ));
            if let Some(r) = gps.get("ImgDirectionRef").and_then(value_to_text) {
                entries.push(ascii_entry(TAG_GPS_IMG_DIRECTION_REF, &r));
            }
        }
    }

    entries
}

/// A minimal TIFF: little-endian header and an empty IFD0.
fn empty_tiff() -> Vec<u8> {
    let mut tiff = b"II\x2A\x00".to_vec();
    tiff.extend_from_slice(&8u32.to_le_bytes()); // IFD0 offset
    tiff.extend_from_slice(&0u16.to_le_bytes()); // entry count
    tiff.extend_from_slice(&0u32.to_le_bytes()); // next-IFD pointer
    tiff
}

/// Append one freshly built IFD to the TIFF buffer, returning its offset.
fn write_ifd(result: &mut Vec<u8>, entries: &[RawIfdEntry], big_endian: bool) -> u32 {
    let start = result.len() as u32;
    let mut sorted: Vec<&RawIfdEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.tag_id);

    result.extend_from_slice(&enc_u16(sorted.len() as u16, big_endian));

    // Out-of-line data lands after the next-IFD pointer.
    let mut data_off = start as usize + 2 + sorted.len() * 12 + 4;
    let mut data_area: Vec<u8> = Vec::new();
    for entry in &sorted {
        let mut ib = [0u8; 12];
        ib[0..2].copy_from_slice(&enc_u16(entry.tag_id, big_endian));
        ib[2..4].copy_from_slice(&enc_u16(entry.data_format, big_endian));
        ib[4..8].copy_from_slice(&enc_u32(entry.count, big_endian));
        if let Some(ref extra) = entry.extra_data {
            ib[8..12].copy_from_slice(&enc_u32(data_off as u32, big_endian));
            data_area.extend_from_slice(extra);
            data_off += extra.len();
        } else {
            ib[8..12].copy_from_slice(&entry.inline_value);
        }
        result.extend_from_slice(&ib);
    }

    result.extend_from_slice(&enc_u32(0, big_endian)); // next-IFD pointer
    result.extend_from_slice(&data_area);
    start
}

/// Splice the Exif and GPS sub-IFDs into the TIFF: append each sub-IFD,
/// then rebuild IFD0 at the end with pointer entries and repoint the header.
fn append_sub_ifds(
    base: Vec<u8>,
    exif_entries: &[RawIfdEntry],
    gps_entries: &[RawIfdEntry],
    big_endian: bool,
) -> Option<Vec<u8>> {
    let read_u16 = |data: &[u8], offset: usize| -> u16 {
        if big_endian {
            u16::from_be_bytes([data[offset], data[offset + 1]])
        } else {
            u16::from_le_bytes([data[offset], data[offset + 1]])
        }
    };
    let read_u32 = |data: &[u8], offset: usize| -> u32 {
        if big_endian {
            u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
        } else {
            u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
        }
    };

    if base.len() < 8 {
        return None;
    }
    let ifd0_offset = read_u32(&base, 4) as usize;
    if ifd0_offset + 2 > base.len() {
        return None;
    }
    let ifd0_count = read_u16(&base, ifd0_offset) as usize;
    let ifd0_start = ifd0_offset + 2;
    let ifd0_end = ifd0_start + ifd0_count * 12;
    if ifd0_end + 4 > base.len() {
        return None;
    }
    let ifd0_tag_ids: Vec<u16> = (0..ifd0_count)
        .map(|i| read_u16(&base, ifd0_start + i * 12))
        .collect();
    let ifd0_next = read_u32(&base, ifd0_end);

    let mut result = base.clone();

    let exif_ifd_offset =
        (!exif_entries.is_empty()).then(|| write_ifd(&mut result, exif_entries, big_endian));
    let gps_ifd_offset =
        (!gps_entries.is_empty()).then(|| write_ifd(&mut result, gps_entries, big_endian));

    let mut pointers: Vec<RawIfdEntry> = Vec::new();
    if let Some(off) = exif_ifd_offset {
        pointers.push(long_entry(TAG_EXIF_OFFSET, off, big_endian));
    }
    if let Some(off) = gps_ifd_offset {
        pointers.push(long_entry(TAG_GPS_INFO, off, big_endian));
    }

    // Rebuild IFD0 at the end
    let append_count = pointers
        .iter()
        .filter(|e| !ifd0_tag_ids.contains(&e.tag_id))
        .count();
    let new_ifd0_start = result.len();
    result.extend_from_slice(&enc_u16((ifd0_count + append_count) as u16, big_endian));
    for i in 0..ifd0_count {
        let eo = ifd0_start + i * 12;
        result.extend_from_slice(&base[eo..eo + 12]);
    }
    let append_start = result.len();
    for _ in 0..append_count {
        result.extend_from_slice(&[0u8; 12]);
    }
    result.extend_from_slice(&enc_u32(ifd0_next, big_endian));

    // Fill pointer entries: replace an existing slot or take an appended one
    let entries_base = new_ifd0_start + 2;
    let mut slot = 0;
    for entry in &pointers {
        let mut ib = [0u8; 12];
        ib[0..2].copy_from_slice(&enc_u16(entry.tag_id, big_endian));
        ib[2..4].copy_from_slice(&enc_u16(entry.data_format, big_endian));
        ib[4..8].copy_from_slice(&enc_u32(entry.count, big_endian));
        ib[8..12].copy_from_slice(&entry.inline_value);
        if let Some(idx) = ifd0_tag_ids.iter().position(|&t| t == entry.tag_id) {
            let off = entries_base + idx * 12;
            result[off..off + 12].copy_from_slice(&ib);
        } else {
            let off = append_start + slot * 12;
            result[off..off + 12].copy_from_slice(&ib);
            slot += 1;
        }
    }

    // Repoint the header at the rebuilt IFD0
    let header = enc_u32(new_ifd0_start as u32, big_endian);
    result[4..8].copy_from_slice(&header);
    Some(result)
}

fn value_to_text(value: &MetaValue) -> Option<String> {
    match value {
        MetaValue::Text(s) => Some(s.clone()),
        MetaValue::Int(i) => Some(i.to_string()),
        MetaValue::Float(f) => Some(f.to_string()),
        MetaValue::Dict(_) => None,
    }
}

fn value_to_int(value: &MetaValue) -> Option<i64> {
    match value {
        MetaValue::Int(i) => Some(*i),
        MetaValue::Float(f) => Some(*f as i64),
        MetaValue::Text(s) => s.trim().parse().ok(),
        MetaValue::Dict(_) => None,
    }
}

fn value_to_float(value: &MetaValue) -> Option<f64> {
    match value {
        MetaValue::Float(f) => Some(*f),
        MetaValue::Int(i) => Some(*i as f64),
        MetaValue::Text(s) => parse_rational_text(s),
        MetaValue::Dict(_) => None,
    }
}

/// Approximate a non-negative float as an unsigned rational. Negative values
/// saturate to zero; the GPS schema carries sign in the reference fields.
fn float_to_rational(value: f64) -> (u32, u32) {
    ((value * 10000.0).round() as u32, 10000)
}

/// Decimal degrees as degree/minute/second rationals.
fn dms_rationals(decimal: f64) -> [(u32, u32); 3] {
    let decimal = decimal.abs();
    let degrees = decimal.floor();
    let minutes = ((decimal - degrees) * 60.0).floor();
    let seconds = (decimal - degrees - minutes / 60.0) * 3600.0;

    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        ((seconds * 10000.0).round() as u32, 10000),
    ]
}

/// An `HH:mm:ss.ffffff` string as the three GPSTimeStamp rationals.
fn time_rationals(time: &str) -> Option<[(u32, u32); 3]> {
    let mut parts = time.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some([
        (hours, 1),
        (minutes, 1),
        ((seconds * 1_000_000.0).round() as u32, 1_000_000),
    ])
}
