//! Names, defaults and environment variables shared across the crate.

use std::time::Duration;

pub const APP_NAME: &str = "bison-bin";

/// Base URL of the GNU release mirror.
pub const DEFAULT_MIRROR: &str = "https://ftp.gnu.org/gnu";

pub const BISON: &str = "bison";
pub const M4: &str = "m4";

/// Bison version used when neither an override nor the release index is available.
pub const DEFAULT_BISON_FALLBACK: &str = "3.8.2";
pub const DEFAULT_M4_VERSION: &str = "1.4.19";

pub const DEFAULT_PARALLELISM: usize = 4;

pub const LISTING_TIMEOUT: Duration = Duration::from_secs(10);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

// Build-dir layout
pub const STAGE_DIRNAME: &str = "bison-stage";
pub const PAYLOAD_ROOT_DIRNAME: &str = "bison_bin";
pub const PAYLOAD_DIRNAME: &str = "_bison";
pub const CACHE_TARBALL_DIRNAME: &str = "bison-source-cache";
pub const METADATA_FILENAME: &str = "version.json";

// Environment variables
pub const ENV_BISON_VERSION: &str = "BISON_VERSION";
pub const ENV_M4_VERSION: &str = "M4_VERSION";
pub const ENV_PACKAGE_VERSION: &str = "BISON_BIN_VERSION";
pub const ENV_PARALLEL: &str = "BISON_BUILD_PARALLEL";
pub const ENV_STRIP: &str = "BISON_BIN_STRIP";
pub const ENV_MIRROR: &str = "BISON_BIN_MIRROR";
pub const ENV_TOOLCHAIN: &str = "BISON_BIN_TOOLCHAIN";
pub const ENV_DATA_ROOT: &str = "BISON_BIN_ROOT";
pub const ENV_BINARY_PATH: &str = "BISON_BIN_PATH";
