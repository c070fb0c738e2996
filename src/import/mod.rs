use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{HealthRsError, Result};
use crate::table::EntrySink;

pub mod extract;
pub mod streaming;

pub use extract::{ExtractStats, Extractor, Selector};
pub use streaming::HealthExportReader;

const READ_BUFFER_BYTES: usize = 1 << 20;

/// Open an export document for streaming
pub fn open_export(path: &Path, show_progress: bool) -> Result<HealthExportReader<BufReader<File>>> {
    if !path.is_file() {
        return Err(HealthRsError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path)?;
    let reader = HealthExportReader::new(BufReader::with_capacity(READ_BUFFER_BYTES, file));
    Ok(if show_progress {
        reader.with_progress("Scanning export")
    } else {
        reader
    })
}

/// Make one pass over the export, offering every selected entry to each sink.
///
/// A malformed document aborts the scan; skipped rows only show up in the stats.
pub fn scan(
    path: &Path,
    selector: Selector,
    sinks: &mut [&mut dyn EntrySink],
    show_progress: bool,
) -> Result<ExtractStats> {
    let started = Instant::now();
    info!("Scanning {}", path.display());

    let reader = open_export(path, show_progress)?;
    let mut extractor = Extractor::new(reader, selector);

    for entry in extractor.by_ref() {
        let entry = entry?;
        for sink in sinks.iter_mut() {
            sink.offer(&entry);
        }
    }

    let stats = extractor.stats();
    info!(
        "Scanned {} elements in {:.2?}: {} matched",
        stats.scanned,
        started.elapsed(),
        stats.matched
    );
    debug!(
        "Skipped {} bad timestamps, {} other sources, {} out of range",
        stats.skipped_timestamp, stats.skipped_source, stats.skipped_range
    );
    Ok(stats)
}
