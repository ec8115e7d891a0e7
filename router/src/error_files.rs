//! Reprocessing of `*.error` files observed in `incoming/`.
//!
//! What the original `process_error_files` does beyond being invoked is not
//! shown in the source this was distilled from - so nothing beyond an
//! operator-visible surfacing is invented here. This is a deliberate Open
//! Question, recorded in DESIGN.md.

use std::path::Path;

use common::config::Config;
use common::telemetry::{ProcessEvent, ProcessEventKind, Severity, Sink};

pub async fn reprocess(cfg: &Config, telemetry: &dyn Sink) -> anyhow::Result<()> {
    let incoming = Path::new(&cfg.incoming_folder);
    let mut entries = tokio::fs::read_dir(incoming).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.ends_with(".error") {
            continue;
        }
        tracing::warn!(file = %name, "observed error file in incoming; awaiting operator action");
        telemetry
            .send_process_event(ProcessEvent::new(
                ProcessEventKind::Processing,
                Severity::Warning,
                format!("error file present in incoming: {name}"),
            ))
            .await;
    }
    Ok(())
}
