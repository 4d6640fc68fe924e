//! The metadata dictionary model and the merge that feeds the re-encoder.
//!
//! Three pieces:
//!
//! - [`MetaValue`]/[`MetaDict`] — a tagged-variant dictionary mirroring the
//!   EXIF namespace structure ("Tiff", "Exif", "Gps" at the top level)
//! - [`gps_block`] — the GPS block computed from a location fix and heading
//! - [`merge`] — overlays the live capture's EXIF and the GPS block onto the
//!   dictionary extracted from the raw input bytes

mod gps;
mod merge;
mod value;

pub use gps::{gps_block, HeadingReading, LocationFix};
pub use merge::merge;
pub use value::{MetaDict, MetaValue, NS_EXIF, NS_GPS, NS_TIFF};
