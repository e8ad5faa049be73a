use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const AUDIT_LOG_FILE: &str = "audit.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DuesReportGenerated,
    RegisterClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub gym_id: String,
    pub actor: String,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(
        gym_id: impl Into<String>,
        actor: impl Into<String>,
        action: AuditAction,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            at: Utc::now(),
            gym_id: gym_id.into(),
            actor: actor.into(),
            action,
            entity: entity.into(),
            entity_id: entity_id.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// 只能追加的 JSON Lines 稽核紀錄
pub struct AuditLog<'a, S: Storage> {
    storage: &'a S,
    path: String,
}

impl<'a, S: Storage> AuditLog<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self::with_path(storage, AUDIT_LOG_FILE)
    }

    pub fn with_path(storage: &'a S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }

    pub async fn record(&self, entry: &AuditEntry) -> Result<()> {
        let mut content = if self.storage.exists(&self.path).await {
            self.storage.read_file(&self.path).await?
        } else {
            Vec::new()
        };

        if !content.is_empty() && !content.ends_with(b"\n") {
            content.push(b'\n');
        }
        content.extend_from_slice(serde_json::to_string(entry)?.as_bytes());
        content.push(b'\n');

        self.storage.write_file(&self.path, &content).await?;
        tracing::debug!(
            "Audit: {:?} {} {} by {}",
            entry.action,
            entry.entity,
            entry.entity_id,
            entry.actor
        );
        Ok(())
    }

    pub async fn entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.storage.exists(&self.path).await {
            return Ok(Vec::new());
        }

        let content = self.storage.read_file(&self.path).await?;
        String::from_utf8_lossy(&content)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_appends_entries() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());
        let log = AuditLog::new(&storage);

        assert!(log.entries().await.unwrap().is_empty());

        let first = AuditEntry::new(
            "gym-a",
            "front-desk",
            AuditAction::RegisterClosed,
            "register",
            "reg-1",
        )
        .with_details(serde_json::json!({"difference_cents": 0}));
        let second = AuditEntry::new(
            "gym-a",
            "scheduler",
            AuditAction::DuesReportGenerated,
            "dues_report",
            "2024-03-01",
        );

        log.record(&first).await.unwrap();
        log.record(&second).await.unwrap();

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], first);
        assert_eq!(entries[1].action, AuditAction::DuesReportGenerated);
    }
}
