use super::gps::{gps_block, HeadingReading, LocationFix};
use super::value::{MetaDict, MetaValue, NS_EXIF, NS_GPS};

/// Merge the live capture's EXIF and a fresh GPS block into the base
/// dictionary extracted from the caller-supplied raw bytes.
///
/// The "Exif" entry is always replaced with `source_exif` — the capture's
/// metadata wins over whatever the raw bytes carried, and an absent source
/// leaves an empty EXIF entry rather than the base one. The "Gps" entry is
/// replaced wholesale when a location is present; without a location the base
/// GPS entry is left exactly as it was. A heading without a location is not
/// embedded.
///
/// This never fails: missing or malformed optional metadata degrades to
/// empty entries.
pub fn merge(
    base: &MetaDict,
    source_exif: Option<&MetaDict>,
    location: Option<&LocationFix>,
    heading: Option<HeadingReading>,
) -> MetaDict {
    let mut merged = base.clone();

    merged.insert(
        NS_EXIF.into(),
        MetaValue::Dict(source_exif.cloned().unwrap_or_default()),
    );

    if let Some(location) = location {
        merged.insert(NS_GPS.into(), MetaValue::Dict(gps_block(location, heading)));
    }

    merged
}
