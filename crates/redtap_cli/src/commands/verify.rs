//! Verify command implementation.

use redtap_rdb::{decode_file, ChecksumOutcome, EventSink, RdbResult, SnapshotEvent, SnapshotOptions};
use std::path::Path;

/// Sink that counts records without keeping them in memory.
struct CountingSink {
    records: usize,
    keys: usize,
}

impl EventSink for CountingSink {
    fn event(&mut self, event: SnapshotEvent) -> RdbResult<()> {
        self.records += 1;
        if matches!(event, SnapshotEvent::KeyValue(_)) {
            self.keys += 1;
        }
        Ok(())
    }
}

/// Runs the verify command.
pub fn run(path: &Path, strict: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying snapshot at {:?}", path);
    println!();

    let options = SnapshotOptions::default().with_checksum_required(strict);
    let mut sink = CountingSink {
        records: 0,
        keys: 0,
    };

    match decode_file(path, options, &mut sink) {
        Ok(summary) => {
            println!("  version:  {}", summary.version);
            println!("  records:  {}", sink.records);
            println!("  keys:     {}", sink.keys);
            match summary.checksum {
                ChecksumOutcome::Verified(value) => {
                    println!("  checksum: {value:016x} (verified)");
                }
                ChecksumOutcome::SkippedZero => {
                    println!("  checksum: absent (zero trailer)");
                }
                ChecksumOutcome::SkippedDisabled => {
                    println!("  checksum: not checked");
                }
                ChecksumOutcome::NotPresent => {
                    println!("  checksum: not present before format version 5");
                }
            }
            println!();
            println!("✓ Snapshot verification passed");
            Ok(())
        }
        Err(err) => {
            println!();
            println!("✗ Snapshot verification failed: {err}");
            Err(Box::new(err))
        }
    }
}
