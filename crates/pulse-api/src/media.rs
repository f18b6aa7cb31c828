use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// 5 MB cap for profile pictures
pub const MAX_PROFILE_PICTURE_SIZE: usize = 5 * 1024 * 1024;
/// 10 MB cap for post images
pub const MAX_POST_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Decoded image bytes that passed extension, signature and size checks.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub enum MediaKind {
    ProfilePicture,
    PostImage,
}

impl MediaKind {
    fn dir(self) -> &'static str {
        match self {
            MediaKind::ProfilePicture => "profile_pictures",
            MediaKind::PostImage => "post_images",
        }
    }
}

/// Uploaded images on local disk, addressed by paths relative to `root`.
pub struct MediaStore {
    root: PathBuf,
    public_url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the image under a fresh name and return its relative path.
    pub async fn save(&self, kind: MediaKind, image: &ValidatedImage) -> anyhow::Result<String> {
        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating media directory {}", dir.display()))?;

        let name = format!("{}.{}", Uuid::new_v4(), image.extension);
        let file_path = dir.join(&name);

        let mut file = tokio::fs::File::create(&file_path)
            .await
            .with_context(|| format!("creating {}", file_path.display()))?;
        file.write_all(&image.bytes)
            .await
            .with_context(|| format!("writing {}", file_path.display()))?;
        file.flush().await?;

        debug!("Stored {} bytes at {}", image.bytes.len(), file_path.display());
        Ok(format!("{}/{}", kind.dir(), name))
    }

    /// Best-effort delete; a missing file is not an error worth surfacing.
    pub async fn remove(&self, relative: &str) {
        let file_path = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&file_path).await {
            warn!("Failed to remove media file {}: {}", file_path.display(), e);
        }
    }

    /// Absolute URL under which the file is served.
    pub fn url(&self, relative: &str) -> String {
        format!("{}/media/{}", self.public_url, relative)
    }
}
