//! Model downloading and caching utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{Error, Result};

/// Files that make up a trained BRISQUE model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFile {
    /// Support vector regressor trained on the LIVE database.
    Svm,
    /// Per-feature scaling bounds used during training.
    Range,
}

impl ModelFile {
    /// Get the filename for this model file.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::Svm => "brisque_model_live.yml",
            Self::Range => "brisque_range_live.yml",
        }
    }

    /// Get the download URL for this model file.
    /// Using the models published with OpenCV's quality module.
    #[must_use]
    pub const fn url(&self) -> &'static str {
        match self {
            Self::Svm => {
                "https://raw.githubusercontent.com/opencv/opencv_contrib/4.x/modules/quality/samples/brisque_model_live.yml"
            }
            Self::Range => {
                "https://raw.githubusercontent.com/opencv/opencv_contrib/4.x/modules/quality/samples/brisque_range_live.yml"
            }
        }
    }

    /// Get the approximate size in bytes for progress indication.
    #[must_use]
    pub const fn approx_size(&self) -> u64 {
        match self {
            Self::Svm => 500_000,
            Self::Range => 2_000,
        }
    }
}

/// Manages the model cache directory and downloads.
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
    allow_download: bool,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Uses the platform-appropriate cache directory:
    /// - Windows: `%LOCALAPPDATA%\brisque-score\models`
    /// - Linux: `~/.cache/brisque-score/models`
    /// - macOS: `~/Library/Caches/brisque-score/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(allow_download: bool) -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(base.join("brisque-score").join("models"), allow_download)
    }

    /// Create a cache rooted at an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_dir(cache_dir: PathBuf, allow_download: bool) -> Result<Self> {
        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self {
            cache_dir,
            allow_download,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing and cannot be downloaded.
    pub fn get_path(&self, file: ModelFile) -> Result<PathBuf> {
        let path = self.cache_dir.join(file.filename());

        if !path.exists() {
            if !self.allow_download {
                return Err(Error::ModelMissing {
                    name: file.filename().to_string(),
                });
            }
            download_file(file.url(), &path, file.filename(), file.approx_size())?;
        }

        Ok(path)
    }
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str, approx_size: u64) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|source| Error::ModelDownload {
            name: name.to_string(),
            source,
        })?;

    let total_size = response.content_length().unwrap_or(approx_size);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map_err(|e| Error::InvalidParameter {
                name: "progress template".to_string(),
                reason: e.to_string(),
            })?
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {name}"));

    // Write to a temporary file first, then rename for atomicity
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;

    let mut downloaded = 0u64;
    let mut reader = response;

    loop {
        let mut buffer = [0u8; 8192];
        let bytes_read = std::io::Read::read(&mut reader, &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    pb.finish_with_message(format!("Downloaded {name}"));

    fs::rename(&temp_path, path)?;

    Ok(())
}
