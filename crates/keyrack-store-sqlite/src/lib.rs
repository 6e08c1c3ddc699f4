//! SQLite-backed [`KeyStore`] implementation.
//!
//! UUIDs are bound as strings, timestamps as unix seconds. Tag-name
//! uniqueness is enforced by the schema, which is what makes concurrent
//! find-or-create converge on a single tag.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use keyrack_storage::{
    CreateKeyParams, KeyFilter, KeyId, KeyPatch, KeyRecord, KeyStore, ProjectId, SortDirection,
    SortField, SortSpec, StoreError, Tag, TagId, TagName,
};

mod blob;

pub use blob::FsBlobStore;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// `~/.keyrack/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".keyrack");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[derive(sqlx::FromRow)]
struct KeyRow {
    id: String,
    project_id: String,
    name: String,
    kind: String,
    login: Option<String>,
    url: Option<String>,
    comment: Option<String>,
    body: Vec<u8>,
    file: Option<String>,
    whitelist: String,
    created_at: i64,
    updated_at: i64,
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

fn parse_ts(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {secs}")))
}

impl KeyRow {
    fn into_record(self) -> Result<KeyRecord, StoreError> {
        Ok(KeyRecord {
            id: KeyId(parse_uuid(&self.id)?),
            project_id: ProjectId(parse_uuid(&self.project_id)?),
            kind: self
                .kind
                .parse()
                .map_err(|e: keyrack_storage::ParseKeyKindError| {
                    StoreError::Backend(e.to_string())
                })?,
            name: self.name,
            login: self.login,
            url: self.url,
            comment: self.comment,
            body: self.body,
            file: self.file,
            whitelist: self.whitelist,
            created_at: parse_ts(self.created_at)?,
            updated_at: parse_ts(self.updated_at)?,
        })
    }
}

fn map_unique(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

const KEY_COLUMNS: &str =
    "id, project_id, name, kind, login, url, comment, body, file, whitelist, created_at, updated_at";

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Name => "name",
        SortField::Login => "login",
        SortField::Url => "url",
        SortField::CreatedAt => "created_at",
    }
}

fn sort_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

#[async_trait::async_trait]
impl KeyStore for SqliteKeyStore {
    // ───────────────────────────────── Keys ─────────────────────────────────

    async fn create_key(&self, params: &CreateKeyParams) -> Result<KeyRecord, StoreError> {
        let id = KeyId::generate();
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO keys(id,project_id,name,kind,login,url,comment,body,file,whitelist,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.project_id.to_string())
        .bind(&params.name)
        .bind(params.kind.as_str())
        .bind(&params.login)
        .bind(&params.url)
        .bind(&params.comment)
        .bind(&params.body)
        .bind(&params.file)
        .bind(&params.whitelist)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        self.get_key(&id).await
    }

    async fn get_key(&self, key_id: &KeyId) -> Result<KeyRecord, StoreError> {
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {KEY_COLUMNS} FROM keys WHERE id=?"
        ))
        .bind(key_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => row.into_record(),
        }
    }

    async fn find_key_by_name(&self, name: &str) -> Result<Option<KeyRecord>, StoreError> {
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {KEY_COLUMNS} FROM keys WHERE name=? ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(KeyRow::into_record).transpose()
    }

    async fn update_key(&self, key_id: &KeyId, patch: &KeyPatch) -> Result<KeyRecord, StoreError> {
        let current = self.get_key(key_id).await?;

        let project_id = patch.project_id.unwrap_or(current.project_id);
        let name = patch.name.clone().unwrap_or(current.name);
        let kind = patch.kind.unwrap_or(current.kind);
        let login = patch.login.clone().unwrap_or(current.login);
        let url = patch.url.clone().unwrap_or(current.url);
        let comment = patch.comment.clone().unwrap_or(current.comment);
        let body = patch.body.clone().unwrap_or(current.body);
        let file = patch.file.clone().unwrap_or(current.file);
        let whitelist = patch.whitelist.clone().unwrap_or(current.whitelist);

        sqlx::query(
            "UPDATE keys SET project_id=?, name=?, kind=?, login=?, url=?, comment=?, body=?, file=?, whitelist=?, updated_at=?
             WHERE id=?",
        )
        .bind(project_id.to_string())
        .bind(&name)
        .bind(kind.as_str())
        .bind(&login)
        .bind(&url)
        .bind(&comment)
        .bind(&body)
        .bind(&file)
        .bind(&whitelist)
        .bind(Utc::now().timestamp())
        .bind(key_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        self.get_key(key_id).await
    }

    async fn delete_key(&self, key_id: &KeyId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM keys_tags WHERE key_id=?")
            .bind(key_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let result = sqlx::query("DELETE FROM keys WHERE id=?")
            .bind(key_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(backend)
    }

    async fn override_key_id(&self, key_id: &KeyId, new_id: &KeyId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // keys_tags.key_id references keys(id); defer the check so the key
        // and its tag links can move within one transaction
        sqlx::query("PRAGMA defer_foreign_keys = ON")
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let result = sqlx::query("UPDATE keys SET id=? WHERE id=?")
            .bind(new_id.to_string())
            .bind(key_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_unique)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("UPDATE keys_tags SET key_id=? WHERE key_id=?")
            .bind(new_id.to_string())
            .bind(key_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)
    }

    async fn list_keys(
        &self,
        project_id: &ProjectId,
        filter: &KeyFilter,
        sort: &SortSpec,
    ) -> Result<Vec<KeyRecord>, StoreError> {
        let order = format!(
            "ORDER BY k.{} {}, k.id ASC",
            sort_column(sort.field),
            sort_keyword(sort.direction)
        );

        let rows = match filter {
            KeyFilter::All => {
                let sql = format!("SELECT {KEY_COLUMNS} FROM keys k WHERE k.project_id=? {order}");
                sqlx::query_as::<_, KeyRow>(&sql)
                    .bind(project_id.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
            KeyFilter::Name(name) => {
                let sql = format!(
                    "SELECT {KEY_COLUMNS} FROM keys k WHERE k.project_id=? AND k.name=? {order}"
                );
                sqlx::query_as::<_, KeyRow>(&sql)
                    .bind(project_id.to_string())
                    .bind(name)
                    .fetch_all(&self.pool)
                    .await
            }
            KeyFilter::Url(url) => {
                let sql = format!(
                    "SELECT {KEY_COLUMNS} FROM keys k WHERE k.project_id=? AND k.url=? {order}"
                );
                sqlx::query_as::<_, KeyRow>(&sql)
                    .bind(project_id.to_string())
                    .bind(url)
                    .fetch_all(&self.pool)
                    .await
            }
            KeyFilter::Tag(tag_id) => {
                let prefixed = KEY_COLUMNS
                    .split(", ")
                    .map(|c| format!("k.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "SELECT {prefixed} FROM keys k
                       JOIN keys_tags kt ON kt.key_id=k.id
                      WHERE k.project_id=? AND kt.tag_id=? {order}"
                );
                sqlx::query_as::<_, KeyRow>(&sql)
                    .bind(project_id.to_string())
                    .bind(tag_id.0.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(backend)?;

        rows.into_iter().map(KeyRow::into_record).collect()
    }

    // ───────────────────────────────── Tags ─────────────────────────────────

    async fn find_or_create_tag(&self, name: &TagName) -> Result<Tag, StoreError> {
        if let Some(tag) = self.find_tag_by_name(name).await? {
            return Ok(tag);
        }

        let id = Uuid::now_v7();
        let inserted = sqlx::query("INSERT INTO tags(id,name) VALUES(?,?)")
            .bind(id.to_string())
            .bind(&name.0)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => Ok(Tag {
                id: TagId(id),
                name: name.clone(),
            }),
            // lost a race with a concurrent insert; the winner's row is ours
            Err(e) if e.to_string().contains("UNIQUE") => self
                .find_tag_by_name(name)
                .await?
                .ok_or(StoreError::Conflict),
            Err(e) => Err(backend(e)),
        }
    }

    async fn find_tag_by_name(&self, name: &TagName) -> Result<Option<Tag>, StoreError> {
        let row = sqlx::query_as::<_, (String, String)>("SELECT id, name FROM tags WHERE name=?")
            .bind(&name.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            None => Ok(None),
            Some((id, name)) => Ok(Some(Tag {
                id: TagId(parse_uuid(&id)?),
                name: TagName(name),
            })),
        }
    }

    async fn set_key_tags(&self, key_id: &KeyId, tag_ids: &[TagId]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM keys_tags WHERE key_id=?")
            .bind(key_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        for tag_id in tag_ids {
            sqlx::query("INSERT OR IGNORE INTO keys_tags(key_id,tag_id) VALUES(?,?)")
                .bind(key_id.to_string())
                .bind(tag_id.0.to_string())
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)
    }

    async fn list_key_tags(&self, key_id: &KeyId) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT t.id, t.name FROM tags t
               JOIN keys_tags kt ON kt.tag_id=t.id
              WHERE kt.key_id=?
              ORDER BY t.name",
        )
        .bind(key_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|(id, name)| {
                Ok(Tag {
                    id: TagId(parse_uuid(&id)?),
                    name: TagName(name),
                })
            })
            .collect()
    }
}
