use std::collections::BTreeMap;

/// Top-level namespace key for TIFF/IFD0 tags.
pub const NS_TIFF: &str = "Tiff";
/// Top-level namespace key for the Exif sub-IFD.
pub const NS_EXIF: &str = "Exif";
/// Top-level namespace key for the GPS sub-IFD.
pub const NS_GPS: &str = "Gps";

/// A nested tag-name → value mapping, one per namespace or sub-dictionary.
pub type MetaDict = BTreeMap<String, MetaValue>;

/// A single metadata value.
///
/// EXIF data is inherently heterogeneous (strings, integers, rationals,
/// nested IFDs), so the dictionary holds a small tagged variant per entry
/// instead of an untyped blob.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Text(String),
    Int(i64),
    Float(f64),
    Dict(MetaDict),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as f64. Integers coerce; text does not.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&MetaDict> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for MetaValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<MetaDict> for MetaValue {
    fn from(d: MetaDict) -> Self {
        Self::Dict(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variant() {
        assert_eq!(MetaValue::from("N").as_text(), Some("N"));
        assert_eq!(MetaValue::from(10i64).as_int(), Some(10));
        assert_eq!(MetaValue::from(37.5).as_float(), Some(37.5));
        assert!(MetaValue::from(MetaDict::new()).as_dict().is_some());
    }

    #[test]
    fn accessors_reject_other_variants() {
        assert_eq!(MetaValue::from("N").as_int(), None);
        assert_eq!(MetaValue::from(1.0).as_text(), None);
        assert_eq!(MetaValue::from(1.0).as_dict(), None);
    }

    #[test]
    fn int_coerces_to_float() {
        assert_eq!(MetaValue::from(10i64).as_float(), Some(10.0));
        assert_eq!(MetaValue::from("10").as_float(), None);
    }
}
