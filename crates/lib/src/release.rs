//! Release identification and version discovery.
//!
//! A [`Release`] is the `(project, version)` pair a build is pinned to. The
//! version comes from an explicit override when one is given, otherwise from
//! the project's directory listing on the GNU mirror, otherwise from a
//! hardcoded fallback. Discovery never fails: every network or parse problem
//! degrades to the fallback.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::LISTING_TIMEOUT;

/// A project pinned to one version for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
  pub project: String,
  pub version: String,
}

impl Release {
  pub fn new(project: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      project: project.into(),
      version: version.into(),
    }
  }

  /// File name of the release tarball, e.g. `bison-3.8.2.tar.xz`.
  pub fn tarball_name(&self) -> String {
    format!("{}-{}.tar.xz", self.project, self.version)
  }

  /// Canonical download URL of the release tarball below `mirror`.
  pub fn tarball_url(&self, mirror: &str) -> String {
    format!("{}/{}", project_index_url(mirror, &self.project), self.tarball_name())
  }
}

impl fmt::Display for Release {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.project, self.version)
  }
}

fn project_index_url(mirror: &str, project: &str) -> String {
  format!("{}/{}", mirror.trim_end_matches('/'), project)
}

/// Numeric sort key of a version string: every run of digits, in order.
///
/// `3.10.0` becomes `[3, 10, 0]`, which sorts above `[3, 8, 2]`.
pub fn version_key(version: &str) -> Vec<u64> {
  version
    .split(|c: char| !c.is_ascii_digit())
    .filter(|part| !part.is_empty())
    .map(|part| part.parse().unwrap_or(u64::MAX))
    .collect()
}

/// Extract every distinct `<project>-<version>.tar.{gz,bz2,xz}` version from a listing page.
pub fn parse_listing(body: &str, project: &str) -> Vec<String> {
  let pattern = format!(r"{}-(\d+\.\d+(?:\.\d+)?)\.tar\.(?:gz|bz2|xz)", regex::escape(project));
  let re = match Regex::new(&pattern) {
    Ok(re) => re,
    Err(e) => {
      warn!(project, error = %e, "invalid listing pattern");
      return Vec::new();
    }
  };

  let mut versions: Vec<String> = re.captures_iter(body).map(|caps| caps[1].to_string()).collect();
  versions.sort();
  versions.dedup();
  versions
}

/// Pick the highest version under numeric-tuple ordering.
pub fn latest_version<S: AsRef<str>>(versions: &[S]) -> Option<String> {
  versions
    .iter()
    .map(AsRef::as_ref)
    .max_by_key(|v| version_key(v))
    .map(str::to_string)
}

/// Discover the newest released version of `project` on `mirror`.
///
/// Returns `fallback` on any failure.
pub fn discover_latest(mirror: &str, project: &str, fallback: &str) -> String {
  let url = format!("{}/", project_index_url(mirror, project));
  debug!(url = %url, "fetching release listing");

  let body = match fetch_listing(&url) {
    Ok(body) => body,
    Err(e) => {
      warn!(url = %url, error = %e, fallback, "release listing unavailable, using fallback version");
      return fallback.to_string();
    }
  };

  match latest_version(&parse_listing(&body, project)) {
    Some(version) => {
      info!(project, version = %version, "discovered latest release");
      version
    }
    None => {
      warn!(url = %url, fallback, "no releases found in listing, using fallback version");
      fallback.to_string()
    }
  }
}

fn fetch_listing(url: &str) -> Result<String, reqwest::Error> {
  let client = reqwest::blocking::Client::builder().timeout(LISTING_TIMEOUT).build()?;
  client.get(url).send()?.error_for_status()?.text()
}

/// Resolve the version to build: a non-empty override wins, otherwise discovery.
pub fn resolve_version(override_version: Option<&str>, mirror: &str, project: &str, fallback: &str) -> String {
  match override_version.filter(|v| !v.is_empty()) {
    Some(version) => {
      debug!(project, version, "using version override");
      version.to_string()
    }
    None => discover_latest(mirror, project, fallback),
  }
}
