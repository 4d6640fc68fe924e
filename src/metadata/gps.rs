use chrono::{DateTime, Utc};

use super::value::{MetaDict, MetaValue};

/// A single location reading from the device at capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Latitude in signed decimal degrees.
    pub latitude: f64,
    /// Longitude in signed decimal degrees.
    pub longitude: f64,
    /// Altitude in meters, negative below sea level.
    pub altitude: f64,
    /// UTC instant of the fix.
    pub timestamp: DateTime<Utc>,
}

/// A compass heading, referenced to true north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingReading {
    pub degrees: f64,
}

/// Build the GPS metadata block for a location fix.
///
/// Coordinates are stored as non-negative decimal degrees with a separate
/// hemisphere reference, altitude as truncated integer meters with a
/// below-sea-level flag, and timestamps as UTC `yyyy:MM:dd` / `HH:mm:ss.ffffff`
/// strings. The heading, when present, is written as-is under a true-north
/// reference; no range validation is applied.
///
/// Deterministic: identical inputs produce identical blocks.
pub fn gps_block(location: &LocationFix, heading: Option<HeadingReading>) -> MetaDict {
    let mut gps = MetaDict::new();

    let latitude_ref = if location.latitude < 0.0 { "S" } else { "N" };
    let longitude_ref = if location.longitude < 0.0 { "W" } else { "E" };
    let altitude_ref = i64::from(location.altitude < 0.0);

    gps.insert("Latitude".into(), MetaValue::Float(location.latitude.abs()));
    gps.insert("LatitudeRef".into(), latitude_ref.into());
    gps.insert("Longitude".into(), MetaValue::Float(location.longitude.abs()));
    gps.insert("LongitudeRef".into(), longitude_ref.into());
    gps.insert("Altitude".into(), MetaValue::Int(location.altitude.abs().trunc() as i64));
    gps.insert("AltitudeRef".into(), MetaValue::Int(altitude_ref));
    gps.insert("DateStamp".into(), location.timestamp.format("%Y:%m:%d").to_string().into());
    gps.insert("TimeStamp".into(), location.timestamp.format("%H:%M:%S%.6f").to_string().into());

    if let Some(heading) = heading {
        gps.insert("ImgDirection".into(), MetaValue::Float(heading.degrees));
        gps.insert("ImgDirectionRef".into(), "T".into());
    }

    gps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lon: f64, alt: f64) -> LocationFix {
        LocationFix {
            latitude: lat,
            longitude: lon,
            altitude: alt,
            timestamp: "2024-03-01T13:45:30.123456Z".parse().unwrap(),
        }
    }

    #[test]
    fn hemisphere_refs() {
        let block = gps_block(&fix(-10.0, 151.2, 0.0), None);
        assert_eq!(block["LatitudeRef"].as_text(), Some("S"));
        assert_eq!(block["LongitudeRef"].as_text(), Some("E"));
        assert_eq!(block["Latitude"].as_float(), Some(10.0));

        let block = gps_block(&fix(10.0, -122.0, 0.0), None);
        assert_eq!(block["LatitudeRef"].as_text(), Some("N"));
        assert_eq!(block["LongitudeRef"].as_text(), Some("W"));
        assert_eq!(block["Longitude"].as_float(), Some(122.0));
    }

    #[test]
    fn zero_is_northern_and_eastern() {
        let block = gps_block(&fix(0.0, 0.0, 0.0), None);
        assert_eq!(block["LatitudeRef"].as_text(), Some("N"));
        assert_eq!(block["LongitudeRef"].as_text(), Some("E"));
    }

    #[test]
    fn altitude_ref_and_truncation() {
        let block = gps_block(&fix(0.0, 0.0, -5.7), None);
        assert_eq!(block["Altitude"].as_int(), Some(5));
        assert_eq!(block["AltitudeRef"].as_int(), Some(1));

        let block = gps_block(&fix(0.0, 0.0, 0.0), None);
        assert_eq!(block["AltitudeRef"].as_int(), Some(0));

        let block = gps_block(&fix(0.0, 0.0, 10.9), None);
        assert_eq!(block["Altitude"].as_int(), Some(10));
        assert_eq!(block["AltitudeRef"].as_int(), Some(0));
    }

    #[test]
    fn utc_date_and_time_formatting() {
        let block = gps_block(&fix(37.0, -122.0, 10.0), None);
        assert_eq!(block["DateStamp"].as_text(), Some("2024:03:01"));
        assert_eq!(block["TimeStamp"].as_text(), Some("13:45:30.123456"));
    }

    #[test]
    fn heading_written_raw_with_true_north_ref() {
        let block = gps_block(&fix(1.0, 2.0, 3.0), Some(HeadingReading { degrees: 45.0 }));
        assert_eq!(block["ImgDirection"].as_float(), Some(45.0));
        assert_eq!(block["ImgDirectionRef"].as_text(), Some("T"));
    }

    #[test]
    fn out_of_range_heading_passes_through() {
        let block = gps_block(&fix(1.0, 2.0, 3.0), Some(HeadingReading { degrees: 540.0 }));
        assert_eq!(block["ImgDirection"].as_float(), Some(540.0));

        let block = gps_block(&fix(1.0, 2.0, 3.0), Some(HeadingReading { degrees: -15.0 }));
        assert_eq!(block["ImgDirection"].as_float(), Some(-15.0));
    }

    #[test]
    fn no_heading_omits_direction_keys() {
        let block = gps_block(&fix(1.0, 2.0, 3.0), None);
        assert!(!block.contains_key("ImgDirection"));
        assert!(!block.contains_key("ImgDirectionRef"));
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = gps_block(&fix(37.0, -122.0, 10.0), Some(HeadingReading { degrees: 45.0 }));
        let b = gps_block(&fix(37.0, -122.0, 10.0), Some(HeadingReading { degrees: 45.0 }));
        assert_eq!(a, b);
    }
}
