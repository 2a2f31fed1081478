//! Shared utilities.

pub mod perms;

#[cfg(test)]
pub mod testutil;
