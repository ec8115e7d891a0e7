pub mod offpeak;
pub mod sweep;

use std::time::Duration;

use common::clock::Clock;
use common::config::Config;
use common::telemetry::Sink;

pub use offpeak::{is_offpeak, OffpeakError};
pub use sweep::{clean_dir, CleanStats};

#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub ran: bool,
    pub success: CleanStats,
    pub discard: CleanStats,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Offpeak(#[from] OffpeakError),
    #[error("sweep of {path} failed: {source}")]
    Sweep {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs one cleaner pass: outside the off-peak window this is a no-op, the
/// same as the original's `clean()` being a no-op guard at the top. Inside
/// the window, sweeps `success_folder` then `discard_folder` - never
/// `error/`, `incoming/`, or `outgoing/`.
pub async fn run_once(cfg: &Config, telemetry: &dyn Sink, clock: &dyn Clock) -> Result<RunStats, RunError> {
    let now = chrono::DateTime::<chrono::Local>::from(clock.now()).time();
    if !is_offpeak(&cfg.offpeak_start, &cfg.offpeak_end, now)? {
        return Ok(RunStats::default());
    }

    let retention = Duration::from_secs(cfg.retention);
    let success = clean_dir(
        std::path::Path::new(&cfg.success_folder),
        retention,
        telemetry,
        clock,
    )
    .await
    .map_err(|source| RunError::Sweep {
        path: cfg.success_folder.clone(),
        source,
    })?;
    let discard = clean_dir(
        std::path::Path::new(&cfg.discard_folder),
        retention,
        telemetry,
        clock,
    )
    .await
    .map_err(|source| RunError::Sweep {
        path: cfg.discard_folder.clone(),
        source,
    })?;

    Ok(RunStats {
        ran: true,
        success,
        discard,
    })
}
