//! Upload-to-renditions video pipeline.
//!
//! Three binaries share this library:
//! - `upload-api` issues presigned upload URLs,
//! - `dispatcher` turns bucket notifications into one launched job per object,
//! - `transcoder` runs inside each launched job and publishes the renditions.

pub mod app;
pub mod common;
pub mod config;
pub mod docs;
pub mod infrastructure;
pub mod modules;
pub mod routes;
pub mod state;
pub mod workers;
