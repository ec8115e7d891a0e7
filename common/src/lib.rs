//! Shared types and ambient stack for the series-router DICOM routing pipeline.
//!
//! This crate is not intended for direct use - it backs the `router`,
//! `dispatcher`, and `cleaner` binaries, which cooperate purely through the
//! shared filesystem tree described in each crate's documentation.

pub mod clock;
pub mod config;
pub mod directory;
pub mod markers;
pub mod rules;
pub mod series;
pub mod target;
pub mod telemetry;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
