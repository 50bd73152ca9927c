//! Mocked image ingestion: validates the upload and fabricates a stable reference.

use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub base_url: String,
    pub max_bytes: usize,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub image_url: String,
    pub message: String,
}

/// Checks the declared content type and size. Returns the client-facing error message on failure.
pub fn validate_upload(content_type: Option<&str>, size: usize, max_bytes: usize) -> Result<(), String> {
    if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
        return Err("Invalid file type. Please upload an image.".into());
    }
    if size > max_bytes {
        return Err(too_large_message(max_bytes));
    }
    Ok(())
}

pub fn too_large_message(max_bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if max_bytes >= MB && max_bytes % MB == 0 {
        format!("File size too large. Maximum {}MB allowed.", max_bytes / MB)
    } else {
        format!("File size too large. Maximum {} bytes allowed.", max_bytes)
    }
}

pub fn image_reference(config: &UploadConfig, file_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let name: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '-' })
        .collect();
    let name = if name.is_empty() { "image".to_string() } else { name };
    format!("{}/{}-{}", config.base_url.trim_end_matches('/'), millis, name)
}
