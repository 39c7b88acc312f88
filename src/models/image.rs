//! Media library entries stored in the site config.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata for one uploaded image. `filename` is unique within the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub filename: String,
    /// Public URL path, e.g. `/images/patio.jpg`
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub uploaded_at: String,
    #[serde(default)]
    pub size: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request body for updating an image's metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Merge `entry` into the index by filename. Existing entries keep their
/// position; new filenames are appended.
pub fn upsert_image(images: &mut Vec<ImageMetadata>, entry: ImageMetadata) {
    match images.iter_mut().find(|i| i.filename == entry.filename) {
        Some(existing) => *existing = entry,
        None => images.push(entry),
    }
}

/// Remove the entry for `filename`. Returns whether one was present.
pub fn remove_image(images: &mut Vec<ImageMetadata>, filename: &str) -> bool {
    let before = images.len();
    images.retain(|i| i.filename != filename);
    images.len() != before
}
