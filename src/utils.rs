use std::{
    error::Error,
    io::Cursor,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::Duration,
};

use image::ImageReader;
use mime::Mime;

/// Errors that may cross into `spawn_blocking` tasks and back.
pub type BoxError = Box<dyn Error + Send + Sync>;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn http_client() -> reqwest::Client {
    pub static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    HTTP_CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("failed to build http client.")
        })
        .clone()
}

pub fn guess_image_mime(data: &[u8]) -> Option<Mime> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .format()?
        .to_mime_type()
        .parse::<Mime>()
        .ok()
}

/// Keeps only characters that are safe in a file name.
pub fn file_stem(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

/// A scratch file that is deleted when dropped. Deletion errors are ignored.
#[derive(Debug)]
pub struct TempFile(PathBuf);

impl TempFile {
    /// `{dir}/{prefix}-{uuid}.{extension}`, unique even for concurrent callers with the same prefix.
    pub fn new_in(dir: &Path, prefix: &str, extension: &str) -> Self {
        let id = uuid::Uuid::new_v4().simple();
        Self(dir.join(format!("{prefix}-{id}.{extension}")))
    }
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::debug!("Could not remove {}: {e}", self.0.display());
            }
        }
    }
}

/// Writes through a temporary sibling and renames it into place, so readers never see a partial file.
pub fn write_atomic(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> std::io::Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or(Path::new("."));
    let stem = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let temp = TempFile::new_in(dir, &stem, "tmp");
    std::fs::write(temp.path(), contents)?;
    std::fs::rename(temp.path(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_is_removed_on_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = {
            let temp = TempFile::new_in(dir.path(), "thumbabc", "img");
            std::fs::write(temp.path(), b"data").unwrap();
            assert!(temp.path().exists());
            temp.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn temp_files_with_same_prefix_differ() {
        let dir = Path::new("cache");
        let a = TempFile::new_in(dir, "thumbabc", "img");
        let b = TempFile::new_in(dir, "thumbabc", "img");
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn atomic_write_leaves_only_the_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("card.png");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn file_stems_drop_path_characters() {
        assert_eq!(file_stem("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(file_stem("../../etc/passwd"), "etcpasswd");
        assert_eq!(file_stem("a b?c"), "abc");
    }

    #[test]
    fn sniffs_png() {
        let mut data = vec![];
        image::RgbImage::new(2, 2)
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(guess_image_mime(&data), Some(mime::IMAGE_PNG));
        assert_eq!(guess_image_mime(b"not an image"), None);
    }
}
