//! SQLite mirror of the CablePath cache.
//!
//! Downstream reporting consumers treat path rows as an opaque read-only
//! cache; this module keeps such a cache in step by consuming the
//! [PathEvent] stream a mutation produced. Writes are batched into one
//! [Transaction] per unit of work.

use sqlx::{
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, QueryBuilder, Row,
};
use std::{collections::BTreeSet, str::FromStr};

use crate::{
    error::ConduitError,
    event::PathEvent,
    path::{CablePath, PathHop},
    properties::{NodeRef, ObjectId},
};

pub const PATH_CACHE_DB: &str = "sqlite:path_cache.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cable_paths ( \
    id TEXT PRIMARY KEY, \
    origins TEXT NOT NULL, \
    destinations TEXT NOT NULL, \
    hops TEXT NOT NULL, \
    is_active INTEGER NOT NULL, \
    is_split INTEGER NOT NULL \
);";

pub struct PathCacheDb {
    pool: Pool<Sqlite>,
}

impl PathCacheDb {
    pub async fn connect(url: &str) -> Result<Self, ConduitError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(PathCacheDb { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn get(&self, id: &ObjectId) -> Result<Option<CablePath>, ConduitError> {
        let row = sqlx::query("SELECT * FROM cable_paths WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_path(&r)).transpose()
    }

    pub async fn active_paths(&self) -> Result<Vec<CablePath>, ConduitError> {
        let rows = sqlx::query("SELECT * FROM cable_paths WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_path).collect()
    }

    /// Every cached path whose hop sequence contains the given link. Hops
    /// are stored as JSON text, so containment is a pattern match on the
    /// serialized id.
    pub async fn paths_through_link(
        &self,
        link: &ObjectId,
    ) -> Result<Vec<CablePath>, ConduitError> {
        let pattern = format!("%{}%", link.as_uuid().hyphenated());
        let rows = sqlx::query("SELECT * FROM cable_paths WHERE hops LIKE ?")
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_path).collect()
    }
}

fn row_to_path(row: &SqliteRow) -> Result<CablePath, ConduitError> {
    let id: String = row.try_get("id")?;
    let origins: String = row.try_get("origins")?;
    let destinations: String = row.try_get("destinations")?;
    let hops: String = row.try_get("hops")?;
    Ok(CablePath {
        id: ObjectId::from_str(&id)?,
        origins: serde_json::from_str::<BTreeSet<NodeRef>>(&origins)?,
        destinations: serde_json::from_str::<BTreeSet<NodeRef>>(&destinations)?,
        hops: serde_json::from_str::<Vec<PathHop>>(&hops)?,
        is_active: row.try_get("is_active")?,
        is_split: row.try_get("is_split")?,
    })
}

/// Batches the [PathEvent]s of one unit of work into a single write.
pub struct Transaction<'a> {
    qb: QueryBuilder<'a, Sqlite>,
    pub staged: usize,
}

impl<'a> Default for Transaction<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Transaction<'a> {
    pub fn new() -> Transaction<'a> {
        Transaction {
            qb: QueryBuilder::<Sqlite>::new(""),
            staged: 0,
        }
    }

    pub fn add_event(&mut self, event: &PathEvent) -> Result<(), ConduitError> {
        match event {
            PathEvent::PathSaved(path) => {
                self.qb.push(
                    "INSERT OR REPLACE INTO cable_paths(id, origins, destinations, hops, is_active, is_split) ",
                );
                let origins = serde_json::to_string(&path.origins)?;
                let destinations = serde_json::to_string(&path.destinations)?;
                let hops = serde_json::to_string(&path.hops)?;
                self.qb.push_values(vec![path], |mut b, path| {
                    b.push_bind::<String>(path.id.into())
                        .push_bind(origins.clone())
                        .push_bind(destinations.clone())
                        .push_bind(hops.clone())
                        .push_bind(path.is_active)
                        .push_bind(path.is_split);
                });
                self.qb.push("; ");
                self.staged += 1;
            }
            PathEvent::PathRemoved(id) => {
                self.qb.push("DELETE FROM cable_paths WHERE id = ");
                self.qb.push_bind(id.to_string());
                self.qb.push("; ");
                self.staged += 1;
            }
            PathEvent::PathActiveChanged(id, active) => {
                self.qb.push("UPDATE cable_paths SET is_active = ");
                self.qb.push_bind(*active);
                self.qb.push(" WHERE id = ");
                self.qb.push_bind(id.to_string());
                self.qb.push("; ");
                self.staged += 1;
            }
            PathEvent::PeerCleared(_) => {
                // Endpoint back-references live with the inventory store,
                // not in this cache.
            }
        }
        Ok(())
    }

    pub async fn execute(&mut self, connection: &Pool<Sqlite>) -> Result<(), ConduitError> {
        if self.staged == 0 {
            return Ok(());
        }
        let query = self.qb.build();
        query.execute(connection).await?;
        self.qb.reset();
        self.staged = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{NodeKind, NodeRef};

    fn sample_path() -> (CablePath, ObjectId) {
        let origin = NodeRef::new(NodeKind::Interface, ObjectId::new());
        let destination = NodeRef::new(NodeKind::Interface, ObjectId::new());
        let link = ObjectId::new();
        let mut path = CablePath::new(BTreeSet::from([origin]));
        path.destinations = BTreeSet::from([destination]);
        path.hops = vec![PathHop::Link(link)];
        (path, link)
    }

    #[tokio::test]
    async fn test_path_event_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}/path_cache.db", dir.path().display());
        let db = PathCacheDb::connect(&url).await.unwrap();

        let (path, link) = sample_path();
        let mut tx = Transaction::new();
        tx.add_event(&PathEvent::PathSaved(path.clone())).unwrap();
        tx.execute(db.pool()).await.unwrap();

        let fetched = db.get(&path.id).await.unwrap().unwrap();
        assert_eq!(fetched, path);

        let through = db.paths_through_link(&link).await.unwrap();
        assert_eq!(through.len(), 1);
        let active = db.active_paths().await.unwrap();
        assert_eq!(active.len(), 1);

        let mut tx = Transaction::new();
        tx.add_event(&PathEvent::PathActiveChanged(path.id, false))
            .unwrap();
        tx.execute(db.pool()).await.unwrap();
        let fetched = db.get(&path.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);

        let mut tx = Transaction::new();
        tx.add_event(&PathEvent::PathRemoved(path.id)).unwrap();
        tx.execute(db.pool()).await.unwrap();
        assert!(db.get(&path.id).await.unwrap().is_none());
    }
}
