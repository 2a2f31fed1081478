//! Source tarball acquisition.
//!
//! Lookup order for a release tarball:
//! 1. the vendored directory (checked into the source tree or prepared by `vendor`)
//! 2. the persistent source cache
//! 3. an HTTP download into the source cache
//!
//! No checksum is verified on any of these paths.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DOWNLOAD_TIMEOUT;
use crate::release::Release;

/// Errors that can occur while acquiring a source tarball.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Failed to create the destination directory.
  #[error("failed to create directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// HTTP request failed or returned a non-success status.
  #[error("fetch failed for {url}: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// Failed to write the downloaded body.
  #[error("failed to write '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Where tarballs are looked up and memoized.
#[derive(Debug, Clone)]
pub struct SourceLocations {
  /// Pre-fetched tarballs, preferred over everything else.
  pub vendor_dir: PathBuf,
  /// Persistent download cache shared between builds.
  pub cache_dir: PathBuf,
}

/// Return a local path to the tarball of `release`, downloading it only when
/// neither a vendored nor a cached copy exists.
pub fn acquire(release: &Release, mirror: &str, locations: &SourceLocations) -> Result<PathBuf, FetchError> {
  let filename = release.tarball_name();

  let vendored = locations.vendor_dir.join(&filename);
  if vendored.is_file() {
    info!(path = ?vendored, "using vendored tarball");
    return Ok(vendored);
  }

  let cached = locations.cache_dir.join(&filename);
  if cached.is_file() {
    info!(path = ?cached, "using cached tarball");
    return Ok(cached);
  }

  download(&release.tarball_url(mirror), &cached)?;
  Ok(cached)
}

/// Make sure the vendored directory holds the tarball of `release`.
pub fn ensure_vendored(release: &Release, mirror: &str, vendor_dir: &Path) -> Result<PathBuf, FetchError> {
  let dest = vendor_dir.join(release.tarball_name());
  if dest.is_file() {
    debug!(path = ?dest, "vendored tarball already present");
    return Ok(dest);
  }

  download(&release.tarball_url(mirror), &dest)?;
  Ok(dest)
}

/// Download `url` to `dest`, creating parent directories as needed.
///
/// The body is written to a `.part` sibling first and renamed into place, so
/// an interrupted download never leaves a truncated file at `dest`.
pub fn download(url: &str, dest: &Path) -> Result<(), FetchError> {
  info!(url = %url, "fetching URL");

  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).map_err(|source| FetchError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }

  let http_err = |source| FetchError::Http {
    url: url.to_string(),
    source,
  };

  let client = reqwest::blocking::Client::builder()
    .timeout(DOWNLOAD_TIMEOUT)
    .build()
    .map_err(http_err)?;
  let bytes = client
    .get(url)
    .send()
    .and_then(|response| response.error_for_status())
    .and_then(|response| response.bytes())
    .map_err(http_err)?;

  let mut partial = dest.as_os_str().to_owned();
  partial.push(".part");
  let partial = PathBuf::from(partial);

  let write_err = |source| FetchError::Write {
    path: dest.to_path_buf(),
    source,
  };
  let mut file = fs::File::create(&partial).map_err(write_err)?;
  file.write_all(&bytes).map_err(write_err)?;
  file.flush().map_err(write_err)?;
  drop(file);
  fs::rename(&partial, dest).map_err(write_err)?;

  info!(path = ?dest, size = bytes.len(), "download complete");
  Ok(())
}
