use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::domain::{identity_key, Lead};

const CSV_HEADER: [&str; 4] = ["Business Name", "Phone", "Search Query", "Timestamp"];

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read lead store: {0}")]
    Read(#[source] csv::Error),
    #[error("failed to open lead store for append: {0}")]
    Open(#[source] std::io::Error),
    #[error("failed to append lead: {0}")]
    Append(#[source] csv::Error),
    #[error("failed to flush lead store: {0}")]
    Flush(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    DuplicateSkipped,
}

/// Durable deduplicated lead store over an append-only CSV file. Single
/// writer; the in-memory key set mirrors the file as of the last successful
/// load or save.
pub struct Ledger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl Ledger {
    /// Reads prior leads once at startup. A missing file means an empty
    /// ledger; rows with fewer than two fields are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let mut seen = HashSet::new();

        if path.exists() {
            let mut reader = csv::ReaderBuilder::new()
                .flexible(true)
                .has_headers(true)
                .from_path(&path)
                .map_err(LedgerError::Read)?;

            for record in reader.records() {
                let record = record.map_err(LedgerError::Read)?;
                let (Some(name), Some(phone)) = (record.get(0), record.get(1)) else {
                    continue;
                };
                seen.insert(identity_key(name, phone).to_string());
            }
        }

        Ok(Ledger { path, seen })
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Appends one lead, creating the file (with its header row) on first
    /// write. Prior rows are never rewritten or reordered; the key set is
    /// updated only after the append has been flushed, so a failed write
    /// leaves the set consistent with the file.
    pub fn save(&mut self, lead: &Lead) -> Result<SaveOutcome, LedgerError> {
        let key = lead.identity_key().to_string();
        if self.seen.contains(&key) {
            return Ok(SaveOutcome::DuplicateSkipped);
        }

        let file_exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(LedgerError::Open)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !file_exists {
            writer.write_record(CSV_HEADER).map_err(LedgerError::Append)?;
        }
        writer
            .write_record([
                lead.name.as_str(),
                lead.phone.as_str(),
                lead.query.as_str(),
                lead.captured_at.as_str(),
            ])
            .map_err(LedgerError::Append)?;
        writer.flush().map_err(LedgerError::Flush)?;

        self.seen.insert(key);
        Ok(SaveOutcome::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PHONE_UNKNOWN;
    use std::fs;
    use uuid::Uuid;

    fn temp_store() -> PathBuf {
        std::env::temp_dir().join(format!("prospect-leads-{}.csv", Uuid::new_v4()))
    }

    fn lead(name: &str, phone: &str) -> Lead {
        Lead::new(
            name.to_string(),
            phone.to_string(),
            "Dentists in Centro".to_string(),
            "2026-08-25 10:00:00".to_string(),
        )
    }

    #[test]
    fn load_tolerates_missing_file() {
        let path = temp_store();
        let ledger = Ledger::load(&path).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn save_then_duplicate_skipped() {
        let path = temp_store();
        let mut ledger = Ledger::load(&path).unwrap();

        assert_eq!(
            ledger.save(&lead("Clinica Zanon", "+595 21 555")).unwrap(),
            SaveOutcome::Saved
        );
        assert_eq!(
            ledger.save(&lead("Clinica Zanon", "+595 21 555")).unwrap(),
            SaveOutcome::DuplicateSkipped
        );

        let contents = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = contents.lines().collect();
        assert_eq!(rows.len(), 2); // header + exactly one lead
        assert!(rows[0].starts_with("Business Name"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn dedup_survives_reload() {
        let path = temp_store();
        {
            let mut ledger = Ledger::load(&path).unwrap();
            ledger.save(&lead("Clinica Zanon", "+595 21 555")).unwrap();
            ledger.save(&lead("Sin Telefono", PHONE_UNKNOWN)).unwrap();
        }

        let mut ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("+595 21 555"));
        assert!(ledger.contains("Sin Telefono"));
        assert_eq!(
            ledger.save(&lead("Sin Telefono", PHONE_UNKNOWN)).unwrap(),
            SaveOutcome::DuplicateSkipped
        );
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_skips_short_rows() {
        let path = temp_store();
        fs::write(
            &path,
            "Business Name,Phone,Search Query,Timestamp\nonlyname\nA Shop,N/A,q,t\n",
        )
        .unwrap();

        let ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains("A Shop"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn same_name_different_phone_both_persist() {
        let path = temp_store();
        let mut ledger = Ledger::load(&path).unwrap();
        assert_eq!(
            ledger.save(&lead("Franchise", "+1")).unwrap(),
            SaveOutcome::Saved
        );
        assert_eq!(
            ledger.save(&lead("Franchise", "+2")).unwrap(),
            SaveOutcome::Saved
        );
        fs::remove_file(&path).unwrap();
    }
}
