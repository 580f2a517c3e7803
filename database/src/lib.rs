use chrono::{DateTime, Utc};
use disaster_core::{
    AidRequest, AidRequestStatus, ClassificationRecord, CoreError, DatabaseError, PostRecord,
    RecordStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};


/// Ids per `IN (...)` lookup, well under SQLite's bind limit.
const LOOKUP_BATCH_SIZE: usize = 200;

const POST_COLUMNS: &str = "post_id, time, query, language, username, verified, followers, \
                            location, retweets, favorites, replies, text";

fn sql_error(e: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_error) = &e {
        if db_error.is_unique_violation() {
            return CoreError::Database(DatabaseError::ConstraintViolation {
                constraint: db_error.message().to_string(),
            });
        }
        if db_error.message().contains("database is locked") {
            return CoreError::Database(DatabaseError::DatabaseLocked);
        }
    }
    CoreError::Database(DatabaseError::Sql(e))
}

fn corrupt(table: &str, details: impl ToString) -> CoreError {
    CoreError::Database(DatabaseError::CorruptRow {
        table: table.to_string(),
        details: details.to_string(),
    })
}

/// Local SQLite copy of the record store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies
    /// migrations.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                CoreError::Database(DatabaseError::ConnectionFailed {
                    reason: format!("{url}: {e}"),
                })
            })?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                CoreError::Database(DatabaseError::ConnectionFailed {
                    reason: e.to_string(),
                })
            })?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Database opened at {}", url);
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                CoreError::Database(DatabaseError::MigrationFailed {
                    migration: e.to_string(),
                })
            })?;
        debug!("Migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts or replaces posts in one transaction.
    pub async fn import_posts(&self, posts: &[PostRecord]) -> Result<usize, CoreError> {
        let mut tx = self.pool.begin().await.map_err(sql_error)?;
        for post in posts {
            sqlx::query(&format!(
                "INSERT OR REPLACE INTO posts ({POST_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(&post.post_id)
            .bind(&post.timestamp)
            .bind(&post.query)
            .bind(&post.language)
            .bind(&post.username)
            .bind(&post.verified)
            .bind(&post.followers)
            .bind(&post.location)
            .bind(&post.retweets)
            .bind(&post.favorites)
            .bind(&post.replies)
            .bind(&post.text)
            .execute(&mut *tx)
            .await
            .map_err(sql_error)?;
        }
        tx.commit().await.map_err(sql_error)?;
        info!("Imported {} posts", posts.len());
        Ok(posts.len())
    }

    /// Inserts or replaces classification rows in one transaction.
    pub async fn import_classifications(
        &self,
        records: &[ClassificationRecord],
    ) -> Result<usize, CoreError> {
        let mut tx = self.pool.begin().await.map_err(sql_error)?;
        for record in records {
            let payload = serde_json::to_string(record)?;
            sqlx::query("INSERT OR REPLACE INTO classifications (post_id, payload) VALUES (?, ?)")
                .bind(&record.post_id)
                .bind(payload)
                .execute(&mut *tx)
                .await
                .map_err(sql_error)?;
        }
        tx.commit().await.map_err(sql_error)?;
        info!("Imported {} classifications", records.len());
        Ok(records.len())
    }
}

fn post_from_row(row: &SqliteRow) -> Result<PostRecord, sqlx::Error> {
    Ok(PostRecord {
        post_id: row.try_get("post_id")?,
        timestamp: row.try_get("time")?,
        query: row.try_get("query")?,
        language: row.try_get("language")?,
        username: row.try_get("username")?,
        verified: row.try_get("verified")?,
        followers: row.try_get("followers")?,
        location: row.try_get("location")?,
        retweets: row.try_get("retweets")?,
        favorites: row.try_get("favorites")?,
        replies: row.try_get("replies")?,
        text: row.try_get("text")?,
    })
}

fn aid_request_from_row(row: &SqliteRow) -> Result<AidRequest, CoreError> {
    let priority: String = row.try_get("priority").map_err(sql_error)?;
    let status: String = row.try_get("status").map_err(sql_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(sql_error)?;

    Ok(AidRequest {
        id: row.try_get("id").map_err(sql_error)?,
        request_type: row.try_get("request_type").map_err(sql_error)?,
        location: row.try_get("location").map_err(sql_error)?,
        description: row.try_get("description").map_err(sql_error)?,
        priority: priority.parse().map_err(|e| corrupt("aid_requests", e))?,
        status: status.parse().map_err(|e| corrupt("aid_requests", e))?,
        created_at,
    })
}

impl RecordStore for SqliteStore {
    async fn search_posts(&self, search_text: &str) -> Result<Vec<PostRecord>, CoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE query LIKE '%' || ? || '%' \
             ORDER BY time DESC"
        ))
        .bind(search_text)
        .fetch_all(&self.pool)
        .await
        .map_err(sql_error)?;

        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_error)?;
        info!("Found {} local posts for '{}'", posts.len(), search_text);
        Ok(posts)
    }

    async fn fetch_classifications(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<ClassificationRecord>, CoreError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(post_ids.len());
        for batch in post_ids.chunks(LOOKUP_BATCH_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT post_id, payload FROM classifications WHERE post_id IN (");
            let mut separated = builder.separated(", ");
            for id in batch {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");

            let rows = builder
                .build()
                .fetch_all(&self.pool)
                .await
                .map_err(sql_error)?;

            for row in rows {
                let post_id: String = row.try_get("post_id").map_err(sql_error)?;
                let payload: String = row.try_get("payload").map_err(sql_error)?;
                match serde_json::from_str::<ClassificationRecord>(&payload) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Skipping unreadable classification for {}: {}", post_id, e),
                }
            }
        }

        debug!(
            "Loaded {} classifications for {} posts",
            records.len(),
            post_ids.len()
        );
        Ok(records)
    }

    async fn list_aid_requests(&self) -> Result<Vec<AidRequest>, CoreError> {
        let rows = sqlx::query(
            "SELECT id, request_type, location, description, priority, status, created_at \
             FROM aid_requests ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(sql_error)?;

        rows.iter().map(aid_request_from_row).collect()
    }

    async fn insert_aid_request(&self, request: &AidRequest) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO aid_requests \
             (id, request_type, location, description, priority, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.request_type)
        .bind(&request.location)
        .bind(&request.description)
        .bind(request.priority.as_str())
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(sql_error)?;
        info!("Stored aid request {}", request.id);
        Ok(())
    }

    async fn update_aid_request_status(
        &self,
        id: &str,
        status: AidRequestStatus,
    ) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE aid_requests SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound {
                resource: format!("aid request {id}"),
            });
        }
        info!("Aid request {} is now {}", id, status);
        Ok(())
    }
}
