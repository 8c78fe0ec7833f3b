//! # Template Store
//!
//! Persistence collaborator for templates: metadata records, immutable
//! numbered content versions and an audit trail of every change.
//! [`MemoryStore`] keeps everything in process memory.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::FolioError;

/// Actor recorded when a request names none.
pub const DEFAULT_ACTOR: &str = "system";

/// Audit entries returned when no limit is given.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Upper bound on audit entries per request.
pub const MAX_AUDIT_LIMIT: usize = 500;

/// Lifecycle status of a stored template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl TemplateStatus {
    /// Parse a status name, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, FolioError> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Ok(TemplateStatus::Draft),
            "PUBLISHED" => Ok(TemplateStatus::Published),
            "ARCHIVED" => Ok(TemplateStatus::Archived),
            other => Err(FolioError::Store(format!(
                "Unknown status '{}'. Available: DRAFT, PUBLISHED, ARCHIVED",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Draft => "DRAFT",
            TemplateStatus::Published => "PUBLISHED",
            TemplateStatus::Archived => "ARCHIVED",
        }
    }
}

/// One immutable snapshot of a template document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersion {
    pub id: Uuid,
    pub template_id: Uuid,
    /// 1-based, increasing per template.
    pub version: u32,
    #[serde(rename = "contentJson")]
    pub content: Value,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A stored template with its current version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: TemplateStatus,
    pub current_version_id: Option<Uuid>,
    pub current_version: Option<TemplateVersion>,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of change recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "template.created")]
    Created,
    #[serde(rename = "template.version.created")]
    VersionCreated,
    #[serde(rename = "template.metadata.updated")]
    MetadataUpdated,
}

/// One audit trail entry with the state before and after the change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: Uuid,
    pub template_id: Uuid,
    pub version_id: Option<Uuid>,
    pub action: AuditAction,
    pub actor_id: String,
    #[serde(rename = "beforeJson")]
    pub before: Option<Value>,
    #[serde(rename = "afterJson")]
    pub after: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Request to create a template with its first version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "contentJson")]
    pub content: Value,
    #[serde(default)]
    pub actor_id: Option<String>,
}

/// Request to add a version to an existing template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVersion {
    #[serde(default, rename = "contentJson")]
    pub content: Value,
    #[serde(default)]
    pub actor_id: Option<String>,
}

/// Partial metadata update. Absent fields are left alone; a present `null`
/// description clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
}

/// Distinguishes a field set to `null` from an absent one.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Actor id for a request, defaulting to [`DEFAULT_ACTOR`].
pub fn actor(actor_id: Option<&str>) -> String {
    actor_id
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

/// Audit page size: 0 or absent means the default, capped at the maximum.
pub fn clamp_audit_limit(limit: Option<usize>) -> usize {
    limit
        .filter(|&l| l > 0)
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT)
}

/// Storage for templates, versions and their audit trail.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Create a template with version 1 of `content`. The name is trimmed
    /// and must not be empty.
    async fn create(&self, input: NewTemplate) -> Result<TemplateRecord, FolioError>;

    /// Append the next version and make it current.
    async fn create_version(&self, id: Uuid, input: NewVersion) -> Result<TemplateRecord, FolioError>;

    async fn update_metadata(&self, id: Uuid, patch: MetadataPatch) -> Result<TemplateRecord, FolioError>;

    /// All templates, most recently updated first.
    async fn list(&self) -> Result<Vec<TemplateRecord>, FolioError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<TemplateRecord>, FolioError>;

    /// Versions of a template, newest first.
    async fn list_versions(&self, id: Uuid) -> Result<Vec<TemplateVersion>, FolioError>;

    /// Audit events of a template, newest first, at most
    /// [`clamp_audit_limit`] entries.
    async fn list_audit(&self, id: Uuid, limit: Option<usize>) -> Result<Vec<AuditEvent>, FolioError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_status_parse() {
        assert_eq!(TemplateStatus::parse("published").unwrap(), TemplateStatus::Published);
        assert_eq!(TemplateStatus::parse(" Archived ").unwrap(), TemplateStatus::Archived);
        assert!(TemplateStatus::parse("gone").is_err());
        assert_eq!(serde_json::to_value(TemplateStatus::Draft).unwrap(), json!("DRAFT"));
    }

    #[test]
    fn test_audit_limit() {
        assert_eq!(clamp_audit_limit(None), 100);
        assert_eq!(clamp_audit_limit(Some(0)), 100);
        assert_eq!(clamp_audit_limit(Some(7)), 7);
        assert_eq!(clamp_audit_limit(Some(10_000)), 500);
    }

    #[test]
    fn test_actor_default() {
        assert_eq!(actor(None), "system");
        assert_eq!(actor(Some("  ")), "system");
        assert_eq!(actor(Some("ada")), "ada");
    }

    #[test]
    fn test_patch_distinguishes_null() {
        let patch: MetadataPatch = serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(patch.description, Some(None));
        let patch: MetadataPatch = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(patch.description, None);
    }

    #[test]
    fn test_audit_action_names() {
        assert_eq!(
            serde_json::to_value(AuditAction::VersionCreated).unwrap(),
            json!("template.version.created")
        );
    }
}
