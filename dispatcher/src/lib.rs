//! Scans `outgoing/` for ready series directories and delivers them via
//! `dcmsend`, with retry/backoff and suspension into `error/`.

pub mod execute;
pub mod exit_codes;
pub mod scan;

pub use execute::{execute as execute_one, ExecuteOutcome};
pub use scan::{is_ready_for_sending, scan_and_dispatch, DispatchStats};
