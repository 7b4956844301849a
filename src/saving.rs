use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::StoreError;
use crate::ledger::Ledger;

/// Writes a gzip-compressed bincode snapshot of the whole ledger.
pub fn save_ledger(ledger: &Ledger, filename: impl AsRef<Path>) -> Result<(), StoreError> {
    let filename = filename.as_ref();
    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, ledger)?;

    let encoder = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    encoder.finish()?.flush()?;

    info!(
        "saved snapshot of {} subjects to {}",
        ledger.records().len(),
        filename.display()
    );
    Ok(())
}

pub fn load_ledger(filename: impl AsRef<Path>) -> Result<Ledger, StoreError> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let ledger: Ledger = deserialize_from(&mut reader)?;

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn snapshot_restores_the_same_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.bin.gz");
        let today = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();

        let mut ledger = Ledger::new();
        ledger.add_subject("Physics", 12, today).unwrap();
        ledger.add_subject("Organic, Chem", 3, today).unwrap();
        ledger.mark_completed("Physics", 4, today).unwrap();

        save_ledger(&ledger, &path).unwrap();
        let loaded = load_ledger(&path).unwrap();

        assert_eq!(loaded, ledger);
        assert_eq!(loaded.history().len(), 1);
    }

    #[test]
    fn loading_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.bin.gz");
        std::fs::write(&path, b"not a snapshot").unwrap();

        assert!(load_ledger(&path).is_err());
        assert!(matches!(
            load_ledger(dir.path().join("missing.bin.gz")),
            Err(StoreError::Io(_))
        ));
    }
}
