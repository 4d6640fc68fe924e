use thiserror::Error;

/// Failures of a single save attempt.
///
/// Every variant is terminal for the attempt: there are no partial retries
/// and no fallback to saving without metadata.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Image or image bytes absent at save time.
    #[error("image or image data missing at save time")]
    MissingInput,

    /// A byte stream yielded no extractable pixel source or metadata.
    #[error("no extractable metadata or pixel source: {0}")]
    MetadataExtraction(String),

    /// The output JPEG container could not be initialized.
    #[error("could not create output destination: {0}")]
    DestinationCreation(String),

    /// The encoder could not finalize the output stream.
    #[error("encoder failed to finalize: {0}")]
    Finalize(String),

    /// Photo library access was not authorized.
    #[error("photo library access denied")]
    PermissionDenied,

    /// Writing the final bytes to disk failed.
    #[error("failed to persist image data: {0}")]
    Persistence(#[from] std::io::Error),

    /// The library rejected the asset creation request.
    #[error("asset creation failed: {0}")]
    AssetCreation(String),

    /// The asset was created but could not be fetched back. The image may
    /// have been saved even though no reference can be handed to the caller.
    #[error("saved asset could not be fetched")]
    AssetFetch,
}
