use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::model::{Node, NodeId, NodeKind, ShareRecord, TrashState, UserId, VersionId};
use common::store::{NodeStore, Page, StoreError};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::Database;

pub(super) const DEFAULT_PAGE_SIZE: usize = 256;

const NODE_COLUMNS: &str = r#"
    id, kind, owner, name, parent_id, editors, viewers, editors_can_share,
    trashed_at, trash_expires_at, trashed_from, erased,
    created_at, last_modified, latest_version, size
"#;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("failed to encode collaborator set: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid page token: {0}")]
    InvalidPageToken(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

type Result<T> = std::result::Result<T, StoreError<DatabaseError>>;

/// Lets `?` lift sqlx and serde errors straight into the store error.
trait IntoStore<T> {
    fn store(self) -> Result<T>;
}

impl<T, E: Into<DatabaseError>> IntoStore<T> for std::result::Result<T, E> {
    fn store(self) -> Result<T> {
        self.map_err(|e| StoreError::Provider(e.into()))
    }
}

fn corrupt(msg: impl Into<String>) -> StoreError<DatabaseError> {
    StoreError::Provider(DatabaseError::Corrupt(msg.into()))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| corrupt(format!("bad uuid {:?}: {}", raw, e)))
}

fn parse_optional_id(raw: Option<String>) -> Result<Option<Uuid>> {
    raw.as_deref().map(parse_id).transpose()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| corrupt(format!("bad timestamp {}", ms)))
}

fn encode_users(users: &BTreeSet<UserId>) -> Result<String> {
    serde_json::to_string(users).store()
}

fn decode_users(raw: &str) -> Result<BTreeSet<UserId>> {
    serde_json::from_str(raw).store()
}

fn node_from_row(row: &SqliteRow) -> Result<Node> {
    let id = parse_id(row.get("id"))?;
    let kind: String = row.get("kind");
    let kind = NodeKind::parse(&kind).ok_or_else(|| corrupt(format!("bad kind {:?}", kind)))?;

    let trash = match row.get::<Option<i64>, _>("trashed_at") {
        Some(trashed_at) => {
            let expires_at = row
                .get::<Option<i64>, _>("trash_expires_at")
                .unwrap_or(trashed_at);
            Some(TrashState {
                trashed_at: from_millis(trashed_at)?,
                expires_at: from_millis(expires_at)?,
                trashed_from: parse_optional_id(row.get("trashed_from"))?,
            })
        }
        None => None,
    };

    Ok(Node {
        id,
        kind,
        owner: UserId::from(row.get::<String, _>("owner")),
        name: row.get("name"),
        parent: parse_optional_id(row.get("parent_id"))?,
        editors: decode_users(row.get("editors"))?,
        viewers: decode_users(row.get("viewers"))?,
        editors_can_share: row.get::<i64, _>("editors_can_share") != 0,
        trash,
        erased: row.get::<i64, _>("erased") != 0,
        created_at: from_millis(row.get("created_at"))?,
        last_modified: from_millis(row.get("last_modified"))?,
        latest_version: parse_optional_id(row.get("latest_version"))?,
        size: row.get::<i64, _>("size").max(0) as u64,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<ShareRecord> {
    Ok(ShareRecord {
        node_id: parse_id(row.get("node_id"))?,
        collaborator: UserId::from(row.get::<String, _>("collaborator")),
        virtual_parent: parse_optional_id(row.get("virtual_parent"))?,
        hidden: row.get::<i64, _>("hidden") != 0,
        direct: row.get::<i64, _>("direct") != 0,
    })
}

impl Database {
    fn page_offset(&self, page: Option<String>) -> Result<i64> {
        match page {
            Some(token) => token
                .parse::<i64>()
                .map_err(|_| StoreError::Provider(DatabaseError::InvalidPageToken(token))),
            None => Ok(0),
        }
    }

    /// Fetch one row past the page to learn whether another page follows.
    fn paginate(&self, rows: Vec<SqliteRow>, offset: i64) -> Result<Page<Node>> {
        let has_more = rows.len() > self.page_size;
        let items = rows
            .iter()
            .take(self.page_size)
            .map(node_from_row)
            .collect::<Result<Vec<_>>>()?;
        let next = has_more.then(|| (offset + self.page_size as i64).to_string());
        Ok(Page { items, next })
    }

    async fn fetch_node(&self, id: NodeId) -> Result<Option<Node>> {
        let row = sqlx::query(&format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&**self)
            .await
            .store()?;
        row.as_ref().map(node_from_row).transpose()
    }

    async fn fetch_root(&self, owner: &UserId) -> Result<Option<Node>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM nodes WHERE owner = ? AND parent_id IS NULL",
            NODE_COLUMNS
        ))
        .bind(owner.as_str())
        .fetch_optional(&**self)
        .await
        .store()?;
        row.as_ref().map(node_from_row).transpose()
    }

    async fn insert_node(&self, node: &Node, or_ignore: bool) -> Result<()> {
        let verb = if or_ignore {
            "INSERT OR IGNORE"
        } else {
            "INSERT"
        };
        let trash = node.trash.as_ref();
        sqlx::query(&format!(
            r#"
            {} INTO nodes ({})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            verb, NODE_COLUMNS
        ))
        .bind(node.id.to_string())
        .bind(node.kind.as_str())
        .bind(node.owner.as_str())
        .bind(&node.name)
        .bind(node.parent.map(|p| p.to_string()))
        .bind(encode_users(&node.editors)?)
        .bind(encode_users(&node.viewers)?)
        .bind(node.editors_can_share)
        .bind(trash.map(|t| t.trashed_at.timestamp_millis()))
        .bind(trash.map(|t| t.expires_at.timestamp_millis()))
        .bind(trash.and_then(|t| t.trashed_from).map(|p| p.to_string()))
        .bind(node.erased)
        .bind(node.created_at.timestamp_millis())
        .bind(node.last_modified.timestamp_millis())
        .bind(node.latest_version.map(|v| v.to_string()))
        .bind(node.size as i64)
        .execute(&**self)
        .await
        .store()?;
        Ok(())
    }

    /// Run an update against a single node, failing if the node is gone.
    async fn update_node<'q>(
        &self,
        id: NodeId,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> Result<()> {
        let result = query.execute(&**self).await.store()?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeStore for Database {
    type Error = DatabaseError;

    async fn get_node(&self, id: NodeId) -> Result<Node> {
        self.fetch_node(id).await?.ok_or(StoreError::NotFound(id))
    }

    async fn put_node(&self, node: &Node) -> Result<()> {
        self.insert_node(node, false).await
    }

    async fn root_folder(&self, owner: &UserId) -> Result<Node> {
        if let Some(root) = self.fetch_root(owner).await? {
            return Ok(root);
        }

        // the partial unique index on roots settles concurrent first uses
        self.insert_node(&Node::root(owner.clone()), true).await?;
        self.fetch_root(owner)
            .await?
            .ok_or_else(|| corrupt(format!("root folder for {} vanished", owner)))
    }

    async fn list_children(&self, parent: NodeId, page: Option<String>) -> Result<Page<Node>> {
        let offset = self.page_offset(page)?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM nodes
            WHERE parent_id = ?
            ORDER BY name, id
            LIMIT ? OFFSET ?
            "#,
            NODE_COLUMNS
        ))
        .bind(parent.to_string())
        .bind(self.page_size as i64 + 1)
        .bind(offset)
        .fetch_all(&**self)
        .await
        .store()?;
        self.paginate(rows, offset)
    }

    async fn list_owned(&self, owner: &UserId, page: Option<String>) -> Result<Page<Node>> {
        let offset = self.page_offset(page)?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM nodes
            WHERE owner = ?
            ORDER BY name, id
            LIMIT ? OFFSET ?
            "#,
            NODE_COLUMNS
        ))
        .bind(owner.as_str())
        .bind(self.page_size as i64 + 1)
        .bind(offset)
        .fetch_all(&**self)
        .await
        .store()?;
        self.paginate(rows, offset)
    }

    async fn update_collaborators(
        &self,
        id: NodeId,
        editors: &BTreeSet<UserId>,
        viewers: &BTreeSet<UserId>,
    ) -> Result<()> {
        let query = sqlx::query("UPDATE nodes SET editors = ?, viewers = ? WHERE id = ?")
            .bind(encode_users(editors)?)
            .bind(encode_users(viewers)?)
            .bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn set_editors_can_share(&self, id: NodeId, allowed: bool) -> Result<()> {
        let query = sqlx::query("UPDATE nodes SET editors_can_share = ? WHERE id = ?")
            .bind(allowed)
            .bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn add_share_record(&self, record: &ShareRecord) -> Result<()> {
        if self.fetch_node(record.node_id).await?.is_none() {
            return Err(StoreError::NotFound(record.node_id));
        }

        sqlx::query(
            r#"
            INSERT INTO share_records (node_id, collaborator, virtual_parent, hidden, direct)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(node_id, collaborator) DO UPDATE SET
                virtual_parent = excluded.virtual_parent,
                hidden = excluded.hidden,
                direct = excluded.direct
            "#,
        )
        .bind(record.node_id.to_string())
        .bind(record.collaborator.as_str())
        .bind(record.virtual_parent.map(|p| p.to_string()))
        .bind(record.hidden)
        .bind(record.direct)
        .execute(&**self)
        .await
        .store()?;
        Ok(())
    }

    async fn remove_share_record(&self, node: NodeId, collaborator: &UserId) -> Result<()> {
        sqlx::query("DELETE FROM share_records WHERE node_id = ? AND collaborator = ?")
            .bind(node.to_string())
            .bind(collaborator.as_str())
            .execute(&**self)
            .await
            .store()?;
        Ok(())
    }

    async fn get_share_record(
        &self,
        node: NodeId,
        collaborator: &UserId,
    ) -> Result<Option<ShareRecord>> {
        let row = sqlx::query(
            r#"
            SELECT node_id, collaborator, virtual_parent, hidden, direct
            FROM share_records
            WHERE node_id = ? AND collaborator = ?
            "#,
        )
        .bind(node.to_string())
        .bind(collaborator.as_str())
        .fetch_optional(&**self)
        .await
        .store()?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_share_records(&self, node: NodeId) -> Result<Vec<ShareRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT node_id, collaborator, virtual_parent, hidden, direct
            FROM share_records
            WHERE node_id = ?
            ORDER BY collaborator
            "#,
        )
        .bind(node.to_string())
        .fetch_all(&**self)
        .await
        .store()?;
        rows.iter().map(record_from_row).collect()
    }

    async fn set_deleted(&self, id: NodeId, trash: &TrashState) -> Result<()> {
        let query = sqlx::query(
            r#"
            UPDATE nodes
            SET trashed_at = ?, trash_expires_at = ?, trashed_from = ?
            WHERE id = ?
            "#,
        )
        .bind(trash.trashed_at.timestamp_millis())
        .bind(trash.expires_at.timestamp_millis())
        .bind(trash.trashed_from.map(|p| p.to_string()))
        .bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn set_restored(&self, id: NodeId) -> Result<()> {
        let query = sqlx::query(
            r#"
            UPDATE nodes
            SET trashed_at = NULL, trash_expires_at = NULL, trashed_from = NULL
            WHERE id = ?
            "#,
        )
        .bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn set_erased(&self, id: NodeId) -> Result<()> {
        let query = sqlx::query("UPDATE nodes SET erased = 1 WHERE id = ?").bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn set_parent(&self, id: NodeId, parent: NodeId) -> Result<()> {
        let query = sqlx::query("UPDATE nodes SET parent_id = ? WHERE id = ?")
            .bind(parent.to_string())
            .bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn set_name(&self, id: NodeId, name: &str) -> Result<()> {
        let query = sqlx::query("UPDATE nodes SET name = ?, last_modified = ? WHERE id = ?")
            .bind(name.to_string())
            .bind(Utc::now().timestamp_millis())
            .bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn set_content(
        &self,
        id: NodeId,
        version: VersionId,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Result<()> {
        let query = sqlx::query(
            r#"
            UPDATE nodes
            SET latest_version = ?, size = ?, last_modified = ?
            WHERE id = ?
            "#,
        )
        .bind(version.to_string())
        .bind(size as i64)
        .bind(modified.timestamp_millis())
        .bind(id.to_string());
        self.update_node(id, query).await
    }

    async fn remove_node(&self, id: NodeId) -> Result<()> {
        let mut tx = self.begin().await.store()?;
        sqlx::query("DELETE FROM share_records WHERE node_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .store()?;
        sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .store()?;
        tx.commit().await.store()?;
        Ok(())
    }

    async fn check_name_available(
        &self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        excluding: Option<NodeId>,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM nodes
            WHERE parent_id = ? AND name = ? AND kind = ?
              AND erased = 0 AND trashed_at IS NULL
              AND (? IS NULL OR id != ?)
            LIMIT 1
            "#,
        )
        .bind(parent.to_string())
        .bind(name.to_string())
        .bind(kind.as_str())
        .bind(excluding.map(|id| id.to_string()))
        .bind(excluding.map(|id| id.to_string()))
        .fetch_optional(&**self)
        .await
        .store()?;
        Ok(row.is_none())
    }

    async fn usage(&self, owner: &UserId) -> Result<u64> {
        let row = sqlx::query("SELECT bytes FROM usage WHERE owner = ?")
            .bind(owner.as_str())
            .fetch_optional(&**self)
            .await
            .store()?;
        Ok(row
            .map(|r| r.get::<i64, _>("bytes").max(0) as u64)
            .unwrap_or(0))
    }

    async fn set_usage(&self, owner: &UserId, bytes: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usage (owner, bytes) VALUES (?, ?)
            ON CONFLICT(owner) DO UPDATE SET bytes = excluded.bytes
            "#,
        )
        .bind(owner.as_str())
        .bind(bytes as i64)
        .execute(&**self)
        .await
        .store()?;
        Ok(())
    }

    async fn list_owners(&self) -> Result<Vec<UserId>> {
        let rows = sqlx::query("SELECT DISTINCT owner FROM nodes ORDER BY owner")
            .fetch_all(&**self)
            .await
            .store()?;
        Ok(rows
            .iter()
            .map(|r| UserId::from(r.get::<String, _>("owner")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> Database {
        let url = url::Url::parse("sqlite::memory:").unwrap();
        Database::connect(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_node_round_trips_through_row() {
        let db = setup().await;
        let owner = UserId::from("alice");
        let root = db.root_folder(&owner).await.unwrap();

        let mut file = Node::file(owner.clone(), "notes.txt", root.id);
        file.editors.insert(UserId::from("bob"));
        file.viewers.insert(UserId::from("carol"));
        file.editors_can_share = true;
        file.latest_version = Some(Uuid::new_v4());
        file.size = 42;
        db.put_node(&file).await.unwrap();

        let loaded = db.get_node(file.id).await.unwrap();
        assert_eq!(loaded.name, "notes.txt");
        assert_eq!(loaded.parent, Some(root.id));
        assert_eq!(loaded.editors, file.editors);
        assert_eq!(loaded.viewers, file.viewers);
        assert!(loaded.editors_can_share);
        assert_eq!(loaded.latest_version, file.latest_version);
        assert_eq!(loaded.size, 42);
        assert_eq!(
            loaded.created_at.timestamp_millis(),
            file.created_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_root_folder_is_stable() {
        let db = setup().await;
        let owner = UserId::from("alice");
        let first = db.root_folder(&owner).await.unwrap();
        let second = db.root_folder(&owner).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.is_root());
    }

    #[tokio::test]
    async fn test_list_children_paginates() {
        let db = setup().await.with_page_size(2);
        let owner = UserId::from("alice");
        let root = db.root_folder(&owner).await.unwrap();
        for name in ["e", "b", "a", "d", "c"] {
            db.put_node(&Node::file(owner.clone(), name, root.id))
                .await
                .unwrap();
        }

        let mut names = Vec::new();
        let mut token = None;
        let mut pages = 0;
        loop {
            let page = db.list_children(root.id, token).await.unwrap();
            pages += 1;
            names.extend(page.items.into_iter().map(|n| n.name));
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(pages, 3);
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_trash_state_round_trips() {
        let db = setup().await;
        let owner = UserId::from("alice");
        let root = db.root_folder(&owner).await.unwrap();
        let file = Node::file(owner.clone(), "f", root.id);
        db.put_node(&file).await.unwrap();

        let trash = TrashState {
            trashed_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(30),
            trashed_from: Some(root.id),
        };
        db.set_deleted(file.id, &trash).await.unwrap();

        let loaded = db.get_node(file.id).await.unwrap();
        let state = loaded.trash.unwrap();
        assert_eq!(state.trashed_from, Some(root.id));
        assert_eq!(
            state.expires_at.timestamp_millis(),
            trash.expires_at.timestamp_millis()
        );
        assert!(db
            .check_name_available(root.id, "f", NodeKind::File, None)
            .await
            .unwrap());

        db.set_restored(file.id).await.unwrap();
        assert!(db.get_node(file.id).await.unwrap().trash.is_none());
        assert!(!db
            .check_name_available(root.id, "f", NodeKind::File, None)
            .await
            .unwrap());
        assert!(db
            .check_name_available(root.id, "f", NodeKind::File, Some(file.id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_share_records_upsert_and_vanish_with_node() {
        let db = setup().await;
        let owner = UserId::from("alice");
        let bob = UserId::from("bob");
        let root = db.root_folder(&owner).await.unwrap();
        let file = Node::file(owner.clone(), "f", root.id);
        db.put_node(&file).await.unwrap();

        let mut record = ShareRecord::direct(file.id, bob.clone(), None);
        db.add_share_record(&record).await.unwrap();
        record.hidden = true;
        db.add_share_record(&record).await.unwrap();

        let records = db.list_share_records(file.id).await.unwrap();
        assert_eq!(records, vec![record]);

        db.remove_node(file.id).await.unwrap();
        db.remove_node(file.id).await.unwrap();
        assert!(db.get_share_record(file.id, &bob).await.unwrap().is_none());
        assert!(matches!(
            db.get_node(file.id).await,
            Err(StoreError::NotFound(id)) if id == file.id
        ));
    }

    #[tokio::test]
    async fn test_updates_on_missing_node_are_not_found() {
        let db = setup().await;
        let missing = Uuid::new_v4();
        assert!(matches!(
            db.set_erased(missing).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            db.add_share_record(&ShareRecord::direct(missing, UserId::from("bob"), None))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_usage_and_owners() {
        let db = setup().await;
        let alice = UserId::from("alice");
        assert_eq!(db.usage(&alice).await.unwrap(), 0);
        db.set_usage(&alice, 17).await.unwrap();
        assert_eq!(db.usage(&alice).await.unwrap(), 17);

        db.root_folder(&UserId::from("bob")).await.unwrap();
        db.root_folder(&alice).await.unwrap();
        assert_eq!(
            db.list_owners().await.unwrap(),
            vec![UserId::from("alice"), UserId::from("bob")]
        );
    }
}
