use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::{
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
    GENDERAGE_MODEL_NAME, GENDERAGE_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(model_name, bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = dyn Fn(&str, u64, u64) + Send + Sync;

/// Locations of the three face-analysis model files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub embedding: PathBuf,
    pub genderage: PathBuf,
}

/// Resolve every face-analysis model, downloading the missing ones.
pub fn resolve_all(
    bundled_dir: Option<&Path>,
    progress: Option<&ProgressFn>,
) -> Result<ModelPaths, ModelResolveError> {
    Ok(ModelPaths {
        detector: resolve(DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, bundled_dir, progress)?,
        embedding: resolve(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, bundled_dir, progress)?,
        genderage: resolve(GENDERAGE_MODEL_NAME, GENDERAGE_MODEL_URL, bundled_dir, progress)?,
    })
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. Bundled directory (an explicit `--model-dir`)
/// 2. User cache directory (platform-specific)
/// 3. Download from URL to cache
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<&ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(found) = find_bundled(name, bundled_dir) {
        return Ok(found);
    }

    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, |done, total| {
        if let Some(cb) = progress {
            cb(name, done, total);
        }
    })?;
    Ok(cached_path)
}

fn find_bundled(name: &str, bundled_dir: Option<&Path>) -> Option<PathBuf> {
    bundled_dir
        .map(|dir| dir.join(name))
        .filter(|path| path.exists())
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Toonface/models/`
/// - Linux: `$XDG_CACHE_HOME/Toonface/models/` or `~/.cache/Toonface/models/`
/// - Windows: `%LOCALAPPDATA%/Toonface/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Toonface").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Toonface").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(
    url: &str,
    dest: &Path,
    progress: impl Fn(u64, u64),
) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: impl Fn(u64, u64),
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    // Stream in chunks; the recognition model alone is well over 100MB.
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        progress(downloaded, total);
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))?;
    Ok(())
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> ModelResolveError {
    let path = path.to_path_buf();
    move |source| ModelResolveError::Write { path, source }
}
