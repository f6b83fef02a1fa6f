//! Append-only JSON-lines purchase log.
//!
//! Each line is a full snapshot of a purchase. Status changes append a new
//! snapshot; the last line for an id is its current state.
//!
//! A crash during an append can leave a torn final line. Lines that do not
//! parse are skipped with a warning, and the next append starts on a fresh
//! line, so one torn write never hides the rest of the log.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{instrument, warn};

use ishop_core::{PurchaseId, PurchaseStatus};

use super::{LedgerError, Purchase, PurchaseLedger};

/// Purchase ledger kept as a JSON-lines file.
#[derive(Debug, Clone)]
pub struct FilePurchaseLedger {
    path: PathBuf,
}

impl FilePurchaseLedger {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, purchase: &Purchase) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut line = Vec::new();
        if file.metadata().await?.len() > 0 {
            file.seek(SeekFrom::End(-1)).await?;
            if file.read_u8().await? != b'\n' {
                line.push(b'\n');
            }
        }
        serde_json::to_writer(&mut line, purchase)?;
        line.push(b'\n');

        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    /// Every readable snapshot, oldest first.
    async fn snapshots(&self) -> Result<Vec<Purchase>, LedgerError> {
        // A write torn inside a multi-byte character is not valid UTF-8
        let contents = match tokio::fs::read(&self.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => snapshots.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping unreadable purchase log line"
                ),
            }
        }
        Ok(snapshots)
    }

    async fn latest(&self, id: PurchaseId) -> Result<Option<Purchase>, LedgerError> {
        Ok(self.snapshots().await?.into_iter().rfind(|p| p.id == id))
    }
}

#[async_trait]
impl PurchaseLedger for FilePurchaseLedger {
    #[instrument(skip(self, purchase), fields(purchase_id = %purchase.id))]
    async fn record(&self, purchase: &Purchase) -> Result<(), LedgerError> {
        // Check-then-append is not atomic; overlapping writers can both pass
        if let Some(session_id) = &purchase.checkout_session_id
            && self.find_by_checkout_session(session_id).await?.is_some()
        {
            return Err(LedgerError::DuplicateSession(session_id.clone()));
        }
        self.append(purchase).await
    }

    #[instrument(skip(self, detail), fields(purchase_id = %id, status = %status))]
    async fn mark_status(
        &self,
        id: PurchaseId,
        status: PurchaseStatus,
        detail: Option<&str>,
    ) -> Result<(), LedgerError> {
        let mut purchase = self.latest(id).await?.ok_or(LedgerError::NotFound(id))?;
        purchase.status = status;
        purchase.detail = detail.map(str::to_owned);
        purchase.updated_at = Utc::now();
        self.append(&purchase).await
    }

    async fn get(&self, id: PurchaseId) -> Result<Option<Purchase>, LedgerError> {
        self.latest(id).await
    }

    async fn find_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Purchase>, LedgerError> {
        Ok(self
            .snapshots()
            .await?
            .into_iter()
            .rfind(|p| p.checkout_session_id.as_deref() == Some(session_id)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::test_support::temp_path;
    use crate::purchases::test_support::purchase;

    #[tokio::test]
    async fn test_status_changes_append_snapshots() {
        let ledger = FilePurchaseLedger::new(temp_path("purchases.jsonl"));
        let first = purchase("sword1");
        let second = purchase("71084");

        ledger.record(&first).await.unwrap();
        ledger.record(&second).await.unwrap();
        ledger
            .mark_status(first.id, PurchaseStatus::NoCharacter, None)
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(ledger.path()).await.unwrap();
        assert_eq!(raw.lines().count(), 3);

        let stored = ledger.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::NoCharacter);
        let untouched = ledger.get(second.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, PurchaseStatus::Confirmed);

        tokio::fs::remove_file(ledger.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_log_has_no_purchases() {
        let ledger = FilePurchaseLedger::new(temp_path("absent.jsonl"));
        assert!(ledger.get(PurchaseId::generate()).await.unwrap().is_none());

        let err = ledger
            .mark_status(PurchaseId::generate(), PurchaseStatus::Granted, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_log_lines_are_json_objects() {
        let ledger = FilePurchaseLedger::new(temp_path("format.jsonl"));
        let purchase = purchase("sword1");
        ledger.record(&purchase).await.unwrap();

        let raw = tokio::fs::read_to_string(ledger.path()).await.unwrap();
        let entry: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(entry["item_id"], "sword1");
        assert_eq!(entry["status"], "confirmed");
        assert_eq!(entry["amount_minor"], 999);

        tokio::fs::remove_file(ledger.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_torn_line_does_not_hide_the_log() {
        let ledger = FilePurchaseLedger::new(temp_path("torn.jsonl"));
        let first = purchase("sword1");
        ledger.record(&first).await.unwrap();

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(ledger.path())
            .await
            .unwrap();
        file.write_all(br#"{"id":"0b"#).await.unwrap();
        drop(file);

        let second = purchase("71084");
        ledger.record(&second).await.unwrap();
        ledger
            .mark_status(first.id, PurchaseStatus::Granted, None)
            .await
            .unwrap();

        assert_eq!(
            ledger.get(first.id).await.unwrap().unwrap().status,
            PurchaseStatus::Granted
        );
        assert_eq!(
            ledger.get(second.id).await.unwrap().unwrap().status,
            PurchaseStatus::Confirmed
        );

        let raw = tokio::fs::read_to_string(ledger.path()).await.unwrap();
        assert_eq!(raw.lines().count(), 4);

        tokio::fs::remove_file(ledger.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_checkout_session_is_recorded_once() {
        let ledger = FilePurchaseLedger::new(temp_path("sessions.jsonl"));
        let first = purchase("sword1");
        ledger.record(&first).await.unwrap();
        ledger
            .mark_status(first.id, PurchaseStatus::Granted, None)
            .await
            .unwrap();

        let err = ledger.record(&purchase("sword1")).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateSession(ref id) if id == "cs_test_sword1"));

        let found = ledger
            .find_by_checkout_session("cs_test_sword1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.status, PurchaseStatus::Granted);
        assert!(ledger.find_by_checkout_session("cs_other").await.unwrap().is_none());

        tokio::fs::remove_file(ledger.path()).await.unwrap();
    }
}
