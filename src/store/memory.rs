//! In-memory [`TemplateStore`].

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    actor, clamp_audit_limit, AuditAction, AuditEvent, MetadataPatch, NewTemplate, NewVersion,
    TemplateRecord, TemplateStatus, TemplateStore, TemplateVersion,
};
use crate::error::FolioError;

/// Template record as stored, without the joined current version.
#[derive(Debug, Clone)]
struct Row {
    record: TemplateRecord,
    /// Update sequence number, for stable most-recent-first listing.
    touched: u64,
}

#[derive(Debug, Default)]
struct Inner {
    templates: HashMap<Uuid, Row>,
    versions: Vec<TemplateVersion>,
    audit: Vec<AuditEvent>,
    seq: u64,
}

impl Inner {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn version(&self, id: Option<Uuid>) -> Option<&TemplateVersion> {
        let id = id?;
        self.versions.iter().find(|v| v.id == id)
    }

    /// Record joined with its current version.
    fn joined(&self, row: &Row) -> TemplateRecord {
        let mut record = row.record.clone();
        record.current_version = self.version(record.current_version_id).cloned();
        record
    }

    fn row_mut(&mut self, id: Uuid) -> Result<&mut Row, FolioError> {
        self.templates
            .get_mut(&id)
            .ok_or_else(|| FolioError::NotFound("Template not found.".into()))
    }

    fn push_version(&mut self, template_id: Uuid, content: Value, created_by: &str) -> TemplateVersion {
        let latest = self
            .versions
            .iter()
            .filter(|v| v.template_id == template_id)
            .map(|v| v.version)
            .max()
            .unwrap_or(0);
        let version = TemplateVersion {
            id: Uuid::new_v4(),
            template_id,
            version: latest + 1,
            content,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        self.versions.push(version.clone());
        version
    }

    fn push_audit(
        &mut self,
        template_id: Uuid,
        version_id: Option<Uuid>,
        action: AuditAction,
        actor_id: &str,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.audit.push(AuditEvent {
            id: Uuid::new_v4(),
            template_id,
            version_id,
            action,
            actor_id: actor_id.to_string(),
            before,
            after,
            created_at: Utc::now(),
        });
    }
}

fn metadata_json(record: &TemplateRecord) -> Value {
    json!({
        "name": record.name,
        "description": record.description,
        "status": record.status,
    })
}

/// Template store kept in process memory.
///
/// Every operation runs under one write lock, so a version and its audit
/// entry are always recorded together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn create(&self, input: NewTemplate) -> Result<TemplateRecord, FolioError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(FolioError::Store("Template name is required.".into()));
        }
        let actor_id = actor(input.actor_id.as_deref());
        let mut inner = self.inner.write().await;

        let id = Uuid::new_v4();
        let version = inner.push_version(id, input.content.clone(), &actor_id);
        let now = Utc::now();
        let record = TemplateRecord {
            id,
            name,
            description: input.description,
            status: TemplateStatus::Draft,
            current_version_id: Some(version.id),
            current_version: None,
            created_by: actor_id.clone(),
            updated_by: actor_id.clone(),
            created_at: now,
            updated_at: now,
        };
        let touched = inner.next_seq();
        let row = Row { record, touched };
        let joined = inner.joined(&row);
        inner.templates.insert(id, row);
        inner.push_audit(
            id,
            Some(version.id),
            AuditAction::Created,
            &actor_id,
            None,
            Some(input.content),
        );

        tracing::info!(template = %id, name = %joined.name, actor = %actor_id, "template created");
        Ok(joined)
    }

    async fn create_version(&self, id: Uuid, input: NewVersion) -> Result<TemplateRecord, FolioError> {
        let actor_id = actor(input.actor_id.as_deref());
        let mut inner = self.inner.write().await;

        let previous = inner.row_mut(id)?.record.current_version_id;
        let before = inner.version(previous).map(|v| v.content.clone());
        let version = inner.push_version(id, input.content.clone(), &actor_id);
        let touched = inner.next_seq();

        let row = inner.row_mut(id)?;
        row.record.current_version_id = Some(version.id);
        row.record.updated_by = actor_id.clone();
        row.record.updated_at = Utc::now();
        row.touched = touched;
        let row = row.clone();

        inner.push_audit(
            id,
            Some(version.id),
            AuditAction::VersionCreated,
            &actor_id,
            before,
            Some(input.content),
        );

        tracing::info!(template = %id, version = version.version, actor = %actor_id, "template version created");
        Ok(inner.joined(&row))
    }

    async fn update_metadata(&self, id: Uuid, patch: MetadataPatch) -> Result<TemplateRecord, FolioError> {
        let actor_id = actor(patch.actor_id.as_deref());
        let name = match patch.name.as_deref().map(str::trim) {
            Some("") => return Err(FolioError::Store("Template name cannot be empty.".into())),
            other => other.map(str::to_string),
        };
        let status = patch.status.as_deref().map(TemplateStatus::parse).transpose()?;

        let mut inner = self.inner.write().await;
        let touched = inner.next_seq();
        let row = inner.row_mut(id)?;
        let before = metadata_json(&row.record);

        if let Some(name) = name {
            row.record.name = name;
        }
        if let Some(description) = patch.description {
            row.record.description = description.filter(|d| !d.is_empty());
        }
        if let Some(status) = status {
            row.record.status = status;
        }
        row.record.updated_by = actor_id.clone();
        row.record.updated_at = Utc::now();
        row.touched = touched;
        let after = metadata_json(&row.record);
        let row = row.clone();

        inner.push_audit(
            id,
            row.record.current_version_id,
            AuditAction::MetadataUpdated,
            &actor_id,
            Some(before),
            Some(after),
        );

        tracing::info!(template = %id, status = row.record.status.as_str(), actor = %actor_id, "template metadata updated");
        Ok(inner.joined(&row))
    }

    async fn list(&self) -> Result<Vec<TemplateRecord>, FolioError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&Row> = inner.templates.values().collect();
        rows.sort_by(|a, b| b.touched.cmp(&a.touched));
        Ok(rows.into_iter().map(|r| inner.joined(r)).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<TemplateRecord>, FolioError> {
        let inner = self.inner.read().await;
        Ok(inner.templates.get(&id).map(|r| inner.joined(r)))
    }

    async fn list_versions(&self, id: Uuid) -> Result<Vec<TemplateVersion>, FolioError> {
        let inner = self.inner.read().await;
        let mut versions: Vec<TemplateVersion> = inner
            .versions
            .iter()
            .filter(|v| v.template_id == id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    async fn list_audit(&self, id: Uuid, limit: Option<usize>) -> Result<Vec<AuditEvent>, FolioError> {
        let inner = self.inner.read().await;
        Ok(inner
            .audit
            .iter()
            .rev()
            .filter(|e| e.template_id == id)
            .take(clamp_audit_limit(limit))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_template(name: &str) -> NewTemplate {
        NewTemplate {
            name: name.into(),
            content: json!({"name": name, "page": {"width": 595, "height": 842}}),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_records_version_and_audit() {
        let store = MemoryStore::new();
        let record = store.create(new_template("  Invoice  ")).await.unwrap();
        assert_eq!(record.name, "Invoice");
        assert_eq!(record.status, TemplateStatus::Draft);
        assert_eq!(record.created_by, "system");
        let current = record.current_version.unwrap();
        assert_eq!(current.version, 1);
        assert_eq!(current.content["name"], "Invoice");

        let audit = store.list_audit(record.id, None).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::Created);
        assert_eq!(audit[0].before, None);
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let store = MemoryStore::new();
        assert!(matches!(store.create(new_template("   ")).await, Err(FolioError::Store(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_versions_increment() {
        let store = MemoryStore::new();
        let record = store.create(new_template("Letter")).await.unwrap();
        let updated = store
            .create_version(
                record.id,
                NewVersion {
                    content: json!({"v": 2}),
                    actor_id: Some("ada".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.current_version.as_ref().unwrap().version, 2);
        assert_eq!(updated.updated_by, "ada");

        let versions: Vec<u32> = store
            .list_versions(record.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, vec![2, 1]);

        let audit = store.list_audit(record.id, None).await.unwrap();
        assert_eq!(audit[0].action, AuditAction::VersionCreated);
        assert_eq!(audit[0].before.as_ref().unwrap()["name"], "Letter");
        assert_eq!(audit[0].after, Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_update_metadata() {
        let store = MemoryStore::new();
        let record = store.create(new_template("Statement")).await.unwrap();
        let patch = MetadataPatch {
            status: Some("published".into()),
            description: Some(Some("Monthly".into())),
            ..Default::default()
        };
        let updated = store.update_metadata(record.id, patch).await.unwrap();
        assert_eq!(updated.status, TemplateStatus::Published);
        assert_eq!(updated.description.as_deref(), Some("Monthly"));
        assert_eq!(updated.name, "Statement");

        let audit = store.list_audit(record.id, None).await.unwrap();
        assert_eq!(audit[0].action, AuditAction::MetadataUpdated);
        assert_eq!(audit[0].before.as_ref().unwrap()["status"], "DRAFT");
        assert_eq!(audit[0].after.as_ref().unwrap()["status"], "PUBLISHED");

        let empty_name = MetadataPatch {
            name: Some(" ".into()),
            ..Default::default()
        };
        assert!(store.update_metadata(record.id, empty_name).await.is_err());
        assert!(matches!(
            store.update_metadata(Uuid::new_v4(), MetadataPatch::default()).await,
            Err(FolioError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let store = MemoryStore::new();
        let a = store.create(new_template("A")).await.unwrap();
        let b = store.create(new_template("B")).await.unwrap();
        let names = |list: Vec<TemplateRecord>| list.into_iter().map(|r| r.name).collect::<Vec<_>>();
        assert_eq!(names(store.list().await.unwrap()), vec!["B", "A"]);

        store.create_version(a.id, NewVersion::default()).await.unwrap();
        assert_eq!(names(store.list().await.unwrap()), vec!["A", "B"]);
        assert_eq!(store.get_by_id(b.id).await.unwrap().unwrap().name, "B");
        assert_eq!(store.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_audit_limit() {
        let store = MemoryStore::new();
        let record = store.create(new_template("T")).await.unwrap();
        for _ in 0..3 {
            store.create_version(record.id, NewVersion::default()).await.unwrap();
        }
        assert_eq!(store.list_audit(record.id, Some(2)).await.unwrap().len(), 2);
        assert_eq!(store.list_audit(record.id, Some(0)).await.unwrap().len(), 4);
    }
}
