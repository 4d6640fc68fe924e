use chrono::Utc;
use image::DynamicImage;

use crate::config::SaveOptions;
use crate::error::SaveError;
use crate::jpeg::{extract_metadata, reencode};
use crate::library::{Asset, PhotoLibrary};
use crate::metadata::{merge, HeadingReading, LocationFix, MetaDict, MetaValue, NS_EXIF};

/// The live capture: decoded pixels plus the EXIF the capture itself carries.
///
/// The merge always prefers this EXIF over whatever the caller-supplied raw
/// bytes contain, so the capture's own settings (ISO, exposure, lens) travel
/// with the saved file.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub pixels: DynamicImage,
    pub exif: MetaDict,
}

impl CapturedImage {
    pub fn new(pixels: DynamicImage, exif: MetaDict) -> Self {
        Self { pixels, exif }
    }

    /// Decode a capture from a JPEG byte stream, pulling its EXIF
    /// sub-dictionary from the same bytes.
    pub fn from_jpeg_bytes(bytes: &[u8]) -> Result<Self, SaveError> {
        let pixels = image::load_from_memory(bytes)
            .map_err(|e| SaveError::MetadataExtraction(e.to_string()))?;
        let exif = extract_metadata(bytes)?
            .get(NS_EXIF)
            .and_then(MetaValue::as_dict)
            .cloned()
            .unwrap_or_default();
        Ok(Self { pixels, exif })
    }
}

/// Everything one save operation needs, assembled up front.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// The in-memory capture whose pixels and EXIF are saved.
    pub image: CapturedImage,
    /// The raw byte stream the capture came from; its metadata dictionary is
    /// the merge base.
    pub image_data: Vec<u8>,
    /// Location fix at capture time. Without it no GPS block is written.
    pub location: Option<LocationFix>,
    /// Heading at capture time. Only embedded alongside a location.
    pub heading: Option<HeadingReading>,
}

/// The core transformation: raw bytes plus capture state in, final JPEG
/// stream out.
///
/// Synchronous and free of I/O: extract the base dictionary from the raw
/// bytes, overlay the capture's EXIF and the GPS block, re-encode. Each call
/// works on its own buffers, so independent saves can run concurrently
/// without coordination. Either the full byte stream is returned or the save
/// attempt fails; there is no partial output.
pub fn produce_final_image_bytes(
    request: &SaveRequest,
    options: &SaveOptions,
) -> Result<Vec<u8>, SaveError> {
    if request.image_data.is_empty() {
        return Err(SaveError::MissingInput);
    }

    let base = extract_metadata(&request.image_data)?;
    let merged = merge(
        &base,
        Some(&request.image.exif),
        request.location.as_ref(),
        request.heading,
    );

    reencode(&request.image.pixels, &merged, options.jpeg_quality)
}

/// Run the full save workflow against a photo library.
///
/// Authorization runs first; on denial the pipeline is never entered. The
/// final bytes are staged as `image<unix-seconds>.jpg` in the temp directory
/// and handed to the library, then the created asset is fetched back. An
/// asset that was created but cannot be fetched surfaces as
/// [`SaveError::AssetFetch`] — the image may be in the library even though no
/// reference can be returned.
pub async fn save_image<L: PhotoLibrary>(
    request: SaveRequest,
    options: &SaveOptions,
    library: &L,
) -> Result<Asset, SaveError> {
    library.authorize().await?;

    let bytes = produce_final_image_bytes(&request, options)?;

    let staging_dir = options
        .temp_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let file_path = staging_dir.join(format!("image{}.jpg", Utc::now().timestamp()));
    tokio::fs::write(&file_path, &bytes).await?;
    log::debug!("staged {} bytes at {}", bytes.len(), file_path.display());

    let placeholder = library.create_asset(&file_path).await?;

    match library.fetch_asset(&placeholder.local_identifier).await? {
        Some(asset) => Ok(asset),
        None => Err(SaveError::AssetFetch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::AssetPlaceholder;
    use crate::metadata::{NS_GPS, NS_TIFF};
    use image::RgbImage;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_jpeg_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 24, image::Rgb([200, 100, 50])));
        let mut bytes = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 100);
        encoder.encode_image(&img).unwrap();
        bytes
    }

    fn location() -> LocationFix {
        LocationFix {
            latitude: 37.0,
            longitude: -122.0,
            altitude: 10.0,
            timestamp: "2024-03-01T13:45:30.123456Z".parse().unwrap(),
        }
    }

    fn request_with(location: Option<LocationFix>, heading: Option<HeadingReading>) -> SaveRequest {
        let bytes = test_jpeg_bytes();
        let mut exif = MetaDict::new();
        exif.insert("ISO".into(), MetaValue::Int(100));
        SaveRequest {
            image: CapturedImage::new(image::load_from_memory(&bytes).unwrap(), exif),
            image_data: bytes,
            location,
            heading,
        }
    }

    #[test]
    fn empty_image_data_is_missing_input() {
        let mut request = request_with(None, None);
        request.image_data.clear();
        let err = produce_final_image_bytes(&request, &SaveOptions::default()).unwrap_err();
        assert!(matches!(err, SaveError::MissingInput));
    }

    #[test]
    fn capture_exif_and_gps_land_in_the_output() {
        let request = request_with(Some(location()), Some(HeadingReading { degrees: 45.0 }));
        let bytes = produce_final_image_bytes(&request, &SaveOptions::default()).unwrap();

        let dict = extract_metadata(&bytes).unwrap();
        let exif = dict[crate::metadata::NS_EXIF].as_dict().unwrap();
        assert_eq!(exif["ISO"].as_int(), Some(100));

        let gps = dict[NS_GPS].as_dict().unwrap();
        assert_eq!(gps["LatitudeRef"].as_text(), Some("N"));
        assert_eq!(gps["LongitudeRef"].as_text(), Some("W"));
        assert!((gps["Latitude"].as_float().unwrap() - 37.0).abs() < 1e-4);
        assert!((gps["Longitude"].as_float().unwrap() - 122.0).abs() < 1e-4);
    }

    #[test]
    fn no_location_means_no_gps_block() {
        let request = request_with(None, Some(HeadingReading { degrees: 45.0 }));
        let bytes = produce_final_image_bytes(&request, &SaveOptions::default()).unwrap();

        let dict = extract_metadata(&bytes).unwrap();
        assert!(!dict.contains_key(NS_GPS));
    }

    #[test]
    fn base_tiff_metadata_survives_the_merge() {
        // Stamp Make into the raw bytes first, then save again without a
        // location: the TIFF namespace must carry through.
        let first = request_with(None, None);
        let mut with_tiff = MetaDict::new();
        let mut tiff = MetaDict::new();
        tiff.insert("Make".into(), "Apple".into());
        with_tiff.insert(NS_TIFF.into(), MetaValue::Dict(tiff));
        let stamped = reencode(&first.image.pixels, &with_tiff, 100).unwrap();

        let request = SaveRequest {
            image: CapturedImage::new(first.image.pixels.clone(), MetaDict::new()),
            image_data: stamped,
            location: None,
            heading: None,
        };
        let bytes = produce_final_image_bytes(&request, &SaveOptions::default()).unwrap();

        let dict = extract_metadata(&bytes).unwrap();
        let tiff = dict[NS_TIFF].as_dict().unwrap();
        assert_eq!(tiff["Make"].as_text(), Some("Apple"));
    }

    #[test]
    fn base_gps_block_survives_a_save_without_location() {
        // Stamp a full GPS block into the raw bytes, then save again with no
        // location fix: every field must carry through to the output.
        let first = request_with(None, None);
        let mut with_gps = MetaDict::new();
        with_gps.insert(
            NS_GPS.into(),
            MetaValue::Dict(crate::metadata::gps_block(
                &location(),
                Some(HeadingReading { degrees: 45.0 }),
            )),
        );
        let stamped = reencode(&first.image.pixels, &with_gps, 100).unwrap();

        let request = SaveRequest {
            image: CapturedImage::new(first.image.pixels.clone(), MetaDict::new()),
            image_data: stamped,
            location: None,
            heading: None,
        };
        let bytes = produce_final_image_bytes(&request, &SaveOptions::default()).unwrap();

        let gps = extract_metadata(&bytes).unwrap()[NS_GPS].as_dict().unwrap().clone();
        assert!((gps["Latitude"].as_float().unwrap() - 37.0).abs() < 1e-4);
        assert_eq!(gps["LatitudeRef"].as_text(), Some("N"));
        assert_eq!(gps["LongitudeRef"].as_text(), Some("W"));
        assert_eq!(gps["Altitude"].as_int(), Some(10));
        assert_eq!(gps["AltitudeRef"].as_int(), Some(0));
        assert_eq!(gps["DateStamp"].as_text(), Some("2024:03:01"));
        assert_eq!(gps["TimeStamp"].as_text(), Some("13:45:30.123456"));
        assert_eq!(gps["ImgDirection"].as_float(), Some(45.0));
        assert_eq!(gps["ImgDirectionRef"].as_text(), Some("T"));
    }

    struct MockLibrary {
        authorized: bool,
        fetchable: bool,
    }

    #[async_trait::async_trait]
    impl PhotoLibrary for MockLibrary {
        async fn authorize(&self) -> Result<(), SaveError> {
            if self.authorized {
                Ok(())
            } else {
                Err(SaveError::PermissionDenied)
            }
        }

        async fn create_asset(&self, file: &Path) -> Result<AssetPlaceholder, SaveError> {
            assert!(file.exists());
            Ok(AssetPlaceholder {
                local_identifier: "asset-1".into(),
            })
        }

        async fn fetch_asset(&self, local_identifier: &str) -> Result<Option<Asset>, SaveError> {
            Ok(self.fetchable.then(|| Asset {
                local_identifier: local_identifier.to_string(),
                created: Utc::now(),
            }))
        }
    }

    fn options_in(dir: &TempDir) -> SaveOptions {
        SaveOptions {
            temp_dir: Some(dir.path().to_path_buf()),
            ..SaveOptions::default()
        }
    }

    #[tokio::test]
    async fn save_image_returns_the_fetched_asset() {
        let dir = TempDir::new().unwrap();
        let library = MockLibrary {
            authorized: true,
            fetchable: true,
        };

        let asset = save_image(request_with(Some(location()), None), &options_in(&dir), &library)
            .await
            .unwrap();
        assert_eq!(asset.local_identifier, "asset-1");
    }

    #[tokio::test]
    async fn denied_authorization_never_enters_the_pipeline() {
        let dir = TempDir::new().unwrap();
        let library = MockLibrary {
            authorized: false,
            fetchable: true,
        };

        let mut request = request_with(None, None);
        request.image_data.clear(); // would be MissingInput if the core ran

        let err = save_image(request, &options_in(&dir), &library).await.unwrap_err();
        assert!(matches!(err, SaveError::PermissionDenied));
    }

    #[tokio::test]
    async fn unfetchable_asset_is_a_distinct_failure() {
        let dir = TempDir::new().unwrap();
        let library = MockLibrary {
            authorized: true,
            fetchable: false,
        };

        let err = save_image(request_with(None, None), &options_in(&dir), &library)
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::AssetFetch));
    }
}
