//! JPEG container handling: metadata extraction from raw bytes and the final
//! re-encode that embeds the merged dictionary.
//!
//! Extraction parses the stream with nom-exif into a [`MetaDict`]; the
//! re-encoder serializes pixels with the `image` JPEG encoder, builds the
//! EXIF payload with little_exif, and splices it into the container with
//! img-parts.
//!
//! [`MetaDict`]: crate::metadata::MetaDict

mod encode;
mod extract;
mod tags;

pub use encode::reencode;
pub use extract::extract_metadata;
