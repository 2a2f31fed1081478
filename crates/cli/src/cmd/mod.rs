mod build;
mod clean;
mod info;
mod vendor;
mod version;

pub use build::{BuildArgs, cmd_build};
pub use clean::{CleanArgs, cmd_clean};
pub use info::{InfoArgs, cmd_info};
pub use vendor::{VendorArgs, cmd_vendor};
pub use version::{VersionArgs, cmd_version};
