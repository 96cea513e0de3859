//! ZIP archive handling
//!
//! [`ZipExtractor`] unpacks the per-series archives downloaded from the
//! repository and [`ZipPacker`] writes the per-subject archive. Both are
//! blocking; async callers run them through `spawn_blocking`.

mod pack;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use pack::ZipPacker;
pub use zip::ZipExtractor;
