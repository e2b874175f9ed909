use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One turn in the conversation. Never mutated after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EncodedImage>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MessageId>,
}

impl Message {
    pub fn is_bot(&self) -> bool {
        matches!(self.role, Role::Bot)
    }
}

/// A `data:image/...;base64,` URL that can be shown directly in an `img` tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{};base64,{}", mime_type, BASE64.encode(bytes)))
    }

    /// Accepts an existing data URL, as produced by a canvas or file reader.
    pub fn from_data_url(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let (header, payload) = url.split_once(',')?;
        if !header.starts_with("data:image/") || payload.is_empty() {
            return None;
        }
        Some(Self(url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> &str {
        let header = self.0.split_once(',').map(|(h, _)| h).unwrap_or_default();
        let header = header.trim_start_matches("data:");
        header.split(';').next().unwrap_or_default()
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guesses an image MIME type from a file name. Non-image files yield `None`.
pub fn image_mime_type(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "heic" => "image/heic",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_builds_data_url() {
        let image = EncodedImage::from_bytes("image/png", b"abc");
        assert_eq!(image.as_str(), "data:image/png;base64,YWJj");
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_from_data_url_rejects_non_images() {
        assert!(EncodedImage::from_data_url("data:image/jpeg;base64,AAAA").is_some());
        assert!(EncodedImage::from_data_url("data:text/plain;base64,AAAA").is_none());
        assert!(EncodedImage::from_data_url("data:image/jpeg;base64,").is_none());
        assert!(EncodedImage::from_data_url("not a url").is_none());
    }

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type("leaf.JPG"), Some("image/jpeg"));
        assert_eq!(image_mime_type("/tmp/crop.webp"), Some("image/webp"));
        assert_eq!(image_mime_type("notes.txt"), None);
        assert_eq!(image_mime_type("no_extension"), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Bot).unwrap(), "\"bot\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
