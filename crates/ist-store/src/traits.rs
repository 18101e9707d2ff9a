use ist_types::{Image, ImageStream};

use crate::error::StoreResult;

/// Versioned storage of image streams.
///
/// All implementations must satisfy these invariants:
/// - Every successful create or update assigns a new resourceVersion that
///   differs from every version previously handed out for the same stream.
/// - `update_stream` succeeds only if the stream's `metadata.resource_version`
///   equals the stored one (compare-and-swap); otherwise it fails with
///   `Conflict` and stores nothing.
/// - Returned streams are copies; mutating them has no effect until written.
pub trait StreamStore: Send + Sync {
    /// Read a stream. Returns `Ok(None)` if it does not exist.
    fn get_stream(&self, namespace: &str, name: &str) -> StoreResult<Option<ImageStream>>;

    /// List the streams of a namespace, sorted by name.
    fn list_streams(&self, namespace: &str) -> StoreResult<Vec<ImageStream>>;

    /// Persist a new stream. Fails with `AlreadyExists` if the key is taken.
    ///
    /// The store assigns uid, resourceVersion, and creation timestamp.
    fn create_stream(&self, stream: &ImageStream) -> StoreResult<ImageStream>;

    /// Replace a stream under compare-and-swap on its resourceVersion.
    fn update_stream(&self, stream: &ImageStream) -> StoreResult<ImageStream>;

    /// Delete a stream. Returns `true` if it existed.
    fn delete_stream(&self, namespace: &str, name: &str) -> StoreResult<bool>;
}

/// Read/create access to image metadata.
pub trait ImageStore: Send + Sync {
    /// Read an image by digest. Returns `Ok(None)` if it does not exist.
    fn get_image(&self, name: &str) -> StoreResult<Option<Image>>;

    /// Persist an image. Fails with `AlreadyExists` if the digest is taken.
    fn create_image(&self, image: &Image) -> StoreResult<Image>;
}
