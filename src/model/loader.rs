//! Model downloading and caching utilities.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{Error, Result};

/// Identifies one distributed version of the style transfer network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Model family name.
    pub name: String,
    /// Fixed version identifier within the family.
    pub version: String,
    /// Where to fetch the ONNX file when it is not cached yet.
    pub url: Option<String>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: "arbitrary-image-stylization-v1-256".to_string(),
            version: "2".to_string(),
            url: None,
        }
    }
}

impl ModelSpec {
    /// Name of the cached ONNX file.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}-v{}.onnx", self.name, self.version)
    }

    /// Same model, fetched from `url` when missing.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Manages the model cache directory and downloads.
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Uses the platform-appropriate cache directory:
    /// - Windows: `%LOCALAPPDATA%\stylecast\models`
    /// - Linux: `~/.cache/stylecast/models`
    /// - macOS: `~/Library/Caches/stylecast/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(base.join("stylecast").join("models"))
    }

    /// Create a cache rooted at an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn at<P: Into<PathBuf>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.into();

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self { cache_dir })
    }

    /// Directory holding the cached models.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelUnavailable`] if the file is not cached and
    /// `spec` has no URL, or a download error.
    pub fn model_path(&self, spec: &ModelSpec) -> Result<PathBuf> {
        let path = self.cache_dir.join(spec.filename());

        if path.exists() {
            tracing::debug!("Using cached model {}", path.display());
            return Ok(path);
        }

        match &spec.url {
            Some(url) => {
                download_file(url, &path, &spec.filename())?;
                Ok(path)
            }
            None => Err(Error::ModelUnavailable {
                name: spec.filename(),
                path,
            }),
        }
    }
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let download_err = |source| Error::ModelDownload {
        name: name.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::new();
    let mut response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(download_err)?;

    let pb = response
        .content_length()
        .map_or_else(ProgressBar::new_spinner, ProgressBar::new);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Downloading {name}"));

    // Write to a temporary file first, then rename for atomicity
    let temp_path = path.with_extension("tmp");
    let cache_err = |source| Error::CacheDir {
        path: temp_path.clone(),
        source,
    };

    let file = fs::File::create(&temp_path).map_err(cache_err)?;

    if let Err(err) = write_body(&mut response, file, &pb, name) {
        pb.abandon_with_message(format!("Failed to download {name}"));
        if let Err(remove_err) = fs::remove_file(&temp_path) {
            tracing::warn!("Could not remove {}: {remove_err}", temp_path.display());
        }
        return Err(err);
    }

    pb.finish_with_message(format!("Downloaded {name}"));

    fs::rename(&temp_path, path).map_err(cache_err)?;

    Ok(())
}

/// Stream a response body into `file`.
fn write_body<R: Read>(
    response: &mut R,
    mut file: fs::File,
    pb: &ProgressBar,
    name: &str,
) -> Result<()> {
    let body_err = |source| Error::ModelDownloadIo {
        name: name.to_string(),
        source,
    };

    let mut downloaded = 0u64;
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = response.read(&mut buffer).map_err(body_err)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read]).map_err(body_err)?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    file.flush().map_err(body_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_filename() {
        assert_eq!(
            ModelSpec::default().filename(),
            "arbitrary-image-stylization-v1-256-v2.onnx"
        );
    }

    #[test]
    fn test_cached_file_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::at(dir.path().join("models")).unwrap();
        let spec = ModelSpec::default();

        let expected = cache.dir().join(spec.filename());
        fs::write(&expected, b"onnx").unwrap();

        assert_eq!(cache.model_path(&spec).unwrap(), expected);
    }

    #[test]
    fn test_truncated_download_is_model_load_error() {
        use std::io::{Read as _, Write as _};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        // Promise a large body, send three bytes, hang up
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\nabc")
                .unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::at(dir.path()).unwrap();
        let spec = ModelSpec::default().with_url(format!("http://127.0.0.1:{port}/model.onnx"));

        let err = cache.model_path(&spec).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, Error::ModelDownloadIo { .. }), "{err:?}");
        assert_eq!(err.kind(), crate::ErrorKind::ModelLoad);

        // Neither the partial temp file nor the model file is left behind
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_without_url_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::at(dir.path()).unwrap();

        let err = cache.model_path(&ModelSpec::default()).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::ModelLoad);
    }
}
