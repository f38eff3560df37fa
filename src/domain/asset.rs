//! Input image assets.

use serde::{Deserialize, Serialize};

/// Which side of the packaging an image shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    /// The front of the box.
    Front,
    /// The back of the box.
    Back,
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRole::Front => write!(f, "front"),
            ImageRole::Back => write!(f, "back"),
        }
    }
}

/// Raw uploaded image bytes tagged with their role.
///
/// An asset is owned by exactly one pipeline run and discarded (or handed to
/// the persistence collaborator) when the run completes.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Undecoded image bytes as received from the upload surface.
    pub bytes: Vec<u8>,
    /// Which side of the packaging this is.
    pub role: ImageRole,
}

impl ImageAsset {
    /// Creates an asset from bytes and a role.
    pub fn new(bytes: Vec<u8>, role: ImageRole) -> Self {
        Self { bytes, role }
    }

    /// Creates a front-side asset.
    pub fn front(bytes: Vec<u8>) -> Self {
        Self::new(bytes, ImageRole::Front)
    }

    /// Creates a back-side asset.
    pub fn back(bytes: Vec<u8>) -> Self {
        Self::new(bytes, ImageRole::Back)
    }

    /// Size of the raw payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ImageRole::Front).unwrap(), "\"front\"");
        assert_eq!(serde_json::to_string(&ImageRole::Back).unwrap(), "\"back\"");
    }

    #[test]
    fn constructors_tag_the_role() {
        assert_eq!(ImageAsset::front(vec![1, 2]).role, ImageRole::Front);
        assert_eq!(ImageAsset::back(vec![]).role, ImageRole::Back);
        assert!(ImageAsset::back(vec![]).is_empty());
    }
}
