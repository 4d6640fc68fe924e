//! The recognized-tag table shared by the extractor and the encoder.
//!
//! Tags outside this table are skipped on extraction and never re-embedded;
//! the table covers the fields a camera capture actually carries.

/// Wire-level value family of a tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagKind {
    /// ASCII string (TIFF type 2).
    Text,
    /// Unsigned short (TIFF type 3).
    Int,
    /// Unsigned rational (TIFF type 5).
    Rational,
}

/// One recognized tag: EXIF tag code, stable dictionary name, value family.
pub struct TagSpec {
    pub code: u16,
    pub name: &'static str,
    pub kind: TagKind,
}

const fn tag(code: u16, name: &'static str, kind: TagKind) -> TagSpec {
    TagSpec { code, name, kind }
}

/// IFD0 tags carried under the "Tiff" namespace.
pub const TIFF_TAGS: &[TagSpec] = &[
    tag(0x010E, "ImageDescription", TagKind::Text),
    tag(0x010F, "Make", TagKind::Text),
    tag(0x0110, "Model", TagKind::Text),
    tag(0x0112, "Orientation", TagKind::Int),
    tag(0x011A, "XResolution", TagKind::Rational),
    tag(0x011B, "YResolution", TagKind::Rational),
    tag(0x0128, "ResolutionUnit", TagKind::Int),
    tag(0x0131, "Software", TagKind::Text),
    tag(0x0132, "ModifyDate", TagKind::Text),
    tag(0x013B, "Artist", TagKind::Text),
    tag(0x8298, "Copyright", TagKind::Text),
];

/// Exif sub-IFD tags carried under the "Exif" namespace.
pub const EXIF_TAGS: &[TagSpec] = &[
    tag(0x829A, "ExposureTime", TagKind::Rational),
    tag(0x829D, "FNumber", TagKind::Rational),
    tag(0x8827, "ISO", TagKind::Int),
    tag(0x9003, "DateTimeOriginal", TagKind::Text),
    tag(0x9004, "CreateDate", TagKind::Text),
    tag(0x920A, "FocalLength", TagKind::Rational),
    tag(0xA001, "ColorSpace", TagKind::Int),
    tag(0xA002, "ExifImageWidth", TagKind::Int),
    tag(0xA003, "ExifImageHeight", TagKind::Int),
    tag(0xA405, "FocalLengthIn35mmFormat", TagKind::Int),
    tag(0xA434, "LensModel", TagKind::Text),
];

// Sub-IFD pointer tags written into IFD0.
pub const TAG_EXIF_OFFSET: u16 = 0x8769;
pub const TAG_GPS_INFO: u16 = 0x8825;

// GPS sub-IFD tag codes (dictionary names are fixed by the GPS block).
pub const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
pub const TAG_GPS_LATITUDE: u16 = 0x0002;
pub const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
pub const TAG_GPS_LONGITUDE: u16 = 0x0004;
pub const TAG_GPS_ALTITUDE_REF: u16 = 0x0005;
pub const TAG_GPS_ALTITUDE: u16 = 0x0006;
pub const TAG_GPS_TIMESTAMP: u16 = 0x0007;
pub const TAG_GPS_IMG_DIRECTION_REF: u16 = 0x0010;
pub const TAG_GPS_IMG_DIRECTION: u16 = 0x0011;
pub const TAG_GPS_DATESTAMP: u16 = 0x001D;
