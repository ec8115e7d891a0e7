//! Scans `incoming/` for quiescent series and splits them into per-target
//! `outgoing/<series_uid>#<target_name>/` staging directories.

pub mod error_files;
pub mod scan;

pub use scan::{scan_and_route, RouterStats};
