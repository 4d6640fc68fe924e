//! # geostamp
//!
//! Save captured photographs with EXIF and GPS metadata merged into the JPEG
//! byte stream before they reach a photo library.
//!
//! The core is a pure, deterministic pipeline: extract the metadata
//! dictionary from the raw capture bytes, overlay the live capture's EXIF and
//! a GPS block computed from a location fix and heading, then re-encode the
//! pixels with the merged dictionary embedded. Platform concerns — permission
//! checks, asset creation, asset fetch — sit behind the [`PhotoLibrary`]
//! trait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geostamp::config::SaveOptions;
//! use geostamp::metadata::{HeadingReading, LocationFix};
//! use geostamp::pipeline::{produce_final_image_bytes, CapturedImage, SaveRequest};
//!
//! fn main() -> anyhow::Result<()> {
//!     let raw = std::fs::read("capture.jpg")?;
//!
//!     let request = SaveRequest {
//!         image: CapturedImage::from_jpeg_bytes(&raw)?,
//!         image_data: raw,
//!         location: Some(LocationFix {
//!             latitude: 37.331,
//!             longitude: -122.03,
//!             altitude: 10.0,
//!             timestamp: chrono::Utc::now(),
//!         }),
//!         heading: Some(HeadingReading { degrees: 45.0 }),
//!     };
//!
//!     let bytes = produce_final_image_bytes(&request, &SaveOptions::default())?;
//!     std::fs::write("capture-geotagged.jpg", bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Saving to a library
//!
//! ```rust,no_run
//! use geostamp::config::SaveOptions;
//! use geostamp::library::FolderLibrary;
//! use geostamp::pipeline::{save_image, CapturedImage, SaveRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let raw = std::fs::read("capture.jpg")?;
//!     let request = SaveRequest {
//!         image: CapturedImage::from_jpeg_bytes(&raw)?,
//!         image_data: raw,
//!         location: None,
//!         heading: None,
//!     };
//!
//!     let library = FolderLibrary::new("./photos");
//!     let asset = save_image(request, &SaveOptions::default(), &library).await?;
//!     println!("Saved as {}", asset.local_identifier);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`metadata`] — dictionary model, GPS block encoder, and the merge
//! - [`jpeg`] — metadata extraction and the metadata-embedding re-encoder
//! - [`pipeline`] — the save workflow and its entry points
//! - [`library`] — the photo-library collaborator seam
//! - [`config`] — save options
//! - [`error`] — typed save failures
//!
//! [`PhotoLibrary`]: library::PhotoLibrary

pub mod config;
pub mod error;
pub mod jpeg;
pub mod library;
pub mod metadata;
pub mod pipeline;
