//! bison-bin-lib: build and ship a self-contained GNU Bison
//!
//! The crate is organised along the build pipeline:
//! - `release`: which version to build
//! - `fetch`: where the source tarball comes from
//! - `archive`: unpacking it
//! - `native`: configure / make / make install, toolchain and environment
//! - `stage`: copying the install prefix into the package payload
//! - `pipeline`: running all of the above once, with scratch cleanup
//! - `runtime`: finding and exec'ing the bundled binaries after install

pub mod archive;
pub mod config;
pub mod consts;
pub mod fetch;
pub mod native;
pub mod pipeline;
pub mod platform;
pub mod release;
pub mod runtime;
pub mod stage;
pub mod util;
