//! Terminal output: listings, sizes and upload progress.

use cloudpan_protocol::messages::FileEntry;
use cloudpan_upload::{FileStage, UploadEvent};
use tokio::sync::mpsc;

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

pub fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// One listing line: kind, size, path.
pub fn format_entry(entry: &FileEntry) -> String {
    if entry.is_dir() {
        format!("d {:>10}  {}/", "-", entry.path)
    } else {
        format!("- {:>10}  {}", human_bytes(entry.size), entry.path)
    }
}

/// One progress line for an event, or `None` for events not worth a line.
pub fn format_event(event: &UploadEvent) -> Option<String> {
    match event {
        UploadEvent::Stage { remote_path, stage } => match stage {
            FileStage::BlocksTransferring => Some(format!("uploading {remote_path}")),
            _ => None,
        },
        UploadEvent::Blocks {
            remote_path,
            uploaded,
            total,
        } => Some(format!("  {remote_path}: {uploaded}/{total} blocks")),
        UploadEvent::FileFinished { remote_path, error } => Some(match error {
            None => format!("done {remote_path}"),
            Some(e) => format!("FAILED {remote_path}: {e}"),
        }),
    }
}

/// Prints events to stderr until the channel closes.
pub async fn print_events(mut rx: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = format_event(&event) {
            eprintln!("{line}");
        }
    }
}
