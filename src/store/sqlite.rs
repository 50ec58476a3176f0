//! SQLite policy store
//!
//! Layout:
//! - `warden_policy` - one row per policy, conditions as a JSON document
//! - `warden_policy_subject`, `warden_policy_action`, `warden_policy_resource`
//!   - one row per template, keeping the template order and its compiled regex
//!
//! Only the subject table's compiled regex is read back, to pre-filter
//! candidates in `find_policies_for_subject`. The action and resource tables
//! carry it so every link table shares one layout and can be inspected with
//! plain SQL.

use super::PolicyStore;
use crate::core::condition::ConditionRegistry;
use crate::core::pattern::{compile, Delimiters};
use crate::core::policy::{Effect, Policy, PolicyRecord};
use crate::error::{Result, WardenError};
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const SUBJECT_TABLE: &str = "warden_policy_subject";
const ACTION_TABLE: &str = "warden_policy_action";
const RESOURCE_TABLE: &str = "warden_policy_resource";

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS warden_policy (
    id              TEXT NOT NULL PRIMARY KEY,
    description     TEXT NOT NULL,
    effect          TEXT NOT NULL CHECK (effect = 'allow' OR effect = 'deny'),
    conditions      TEXT NOT NULL,
    start_delimiter TEXT NOT NULL,
    end_delimiter   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS warden_policy_subject (
    policy   TEXT NOT NULL REFERENCES warden_policy(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    template TEXT NOT NULL,
    compiled TEXT NOT NULL,
    PRIMARY KEY (policy, position)
);

CREATE TABLE IF NOT EXISTS warden_policy_action (
    policy   TEXT NOT NULL REFERENCES warden_policy(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    template TEXT NOT NULL,
    compiled TEXT NOT NULL,
    PRIMARY KEY (policy, position)
);

CREATE TABLE IF NOT EXISTS warden_policy_resource (
    policy   TEXT NOT NULL REFERENCES warden_policy(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    template TEXT NOT NULL,
    compiled TEXT NOT NULL,
    PRIMARY KEY (policy, position)
);
";

/// Policy store persisted in a SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
    registry: Arc<ConditionRegistry>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file
    ///
    /// Conditions are decoded with `registry` when policies are loaded.
    pub fn open(path: impl AsRef<Path>, registry: Arc<ConditionRegistry>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SQLite policy store at {:?}", path);
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Self::init(conn, registry, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database
    pub fn open_in_memory(registry: Arc<ConditionRegistry>) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, registry, None)
    }

    fn init(
        conn: Connection,
        registry: Arc<ConditionRegistry>,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
            registry,
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(&self, conn: &Connection, id: &str) -> Result<Policy> {
        let row = conn
            .query_row(
                "SELECT description, effect, conditions, start_delimiter, end_delimiter
                 FROM warden_policy WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((description, effect, conditions, start, end)) = row else {
            return Err(WardenError::NotFound(id.to_string()));
        };

        let record = PolicyRecord {
            id: id.to_string(),
            description,
            effect: effect.parse::<Effect>()?,
            subjects: load_templates(conn, SUBJECT_TABLE, id)?,
            resources: load_templates(conn, RESOURCE_TABLE, id)?,
            actions: load_templates(conn, ACTION_TABLE, id)?,
            conditions: serde_json::from_str(&conditions)?,
            delimiters: Some(Delimiters::new(
                delimiter_char(&start)?,
                delimiter_char(&end)?,
            )),
        };
        Policy::from_record(record, &self.registry)
    }

    fn load_all(&self, conn: &Connection, ids: &BTreeSet<String>) -> Result<Vec<Policy>> {
        ids.iter().map(|id| self.load(conn, id)).collect()
    }
}

impl PolicyStore for SqliteStore {
    fn create(&self, policy: Policy) -> Result<()> {
        policy.validate()?;
        let conditions = serde_json::to_string(&policy.conditions)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO warden_policy
             (id, description, effect, conditions, start_delimiter, end_delimiter)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                policy.id,
                policy.description,
                policy.effect.as_str(),
                conditions,
                policy.delimiters.start.to_string(),
                policy.delimiters.end.to_string(),
            ],
        );
        match inserted {
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(WardenError::Conflict(policy.id));
            }
            Err(err) => return Err(WardenError::store("insert policy", err)),
            Ok(_) => {}
        }

        insert_templates(&tx, SUBJECT_TABLE, &policy, &policy.subjects)?;
        insert_templates(&tx, ACTION_TABLE, &policy, &policy.actions)?;
        insert_templates(&tx, RESOURCE_TABLE, &policy, &policy.resources)?;
        tx.commit()?;

        info!("Creating policy '{}'", policy.id);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Policy> {
        let conn = self.conn.lock();
        self.load(&conn, id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for table in [SUBJECT_TABLE, ACTION_TABLE, RESOURCE_TABLE] {
            tx.execute(
                &format!("DELETE FROM {} WHERE policy = ?1", table),
                params![id],
            )?;
        }
        let removed = tx.execute("DELETE FROM warden_policy WHERE id = ?1", params![id])?;
        tx.commit()?;

        if removed > 0 {
            info!("Deleted policy '{}'", id);
        }
        Ok(())
    }

    fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Policy>> {
        let conn = self.conn.lock();
        let mut ids = BTreeSet::new();

        {
            let mut stmt =
                conn.prepare(&format!("SELECT policy, compiled FROM {}", SUBJECT_TABLE))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (policy, compiled) = row?;
                if ids.contains(&policy) {
                    continue;
                }
                let regex = Regex::new(&compiled).map_err(|e| WardenError::Compile {
                    pattern: compiled.clone(),
                    reason: e.to_string(),
                })?;
                if regex.is_match(subject) {
                    ids.insert(policy);
                }
            }
        }

        {
            let mut stmt = conn.prepare(&format!(
                "SELECT id FROM warden_policy WHERE id NOT IN (SELECT policy FROM {})",
                SUBJECT_TABLE
            ))?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for row in rows {
                ids.insert(row?);
            }
        }

        debug!("Found {} policies for subject '{}'", ids.len(), subject);
        self.load_all(&conn, &ids)
    }

    fn list(&self) -> Result<Vec<Policy>> {
        let conn = self.conn.lock();
        let ids = {
            let mut stmt = conn.prepare("SELECT id FROM warden_policy ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<BTreeSet<String>>>()?
        };
        self.load_all(&conn, &ids)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("registry", &self.registry)
            .finish()
    }
}

fn insert_templates(
    tx: &Transaction<'_>,
    table: &str,
    policy: &Policy,
    templates: &[String],
) -> Result<()> {
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} (policy, position, template, compiled) VALUES (?1, ?2, ?3, ?4)",
        table
    ))?;
    for (position, template) in templates.iter().enumerate() {
        let compiled = compile(template, policy.delimiters)?;
        stmt.execute(params![
            policy.id,
            position as i64,
            template,
            compiled.as_str()
        ])?;
    }
    Ok(())
}

fn load_templates(conn: &Connection, table: &str, id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT template FROM {} WHERE policy = ?1 ORDER BY position",
        table
    ))?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
    let templates = rows.collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(templates)
}

fn delimiter_char(stored: &str) -> Result<char> {
    let mut chars = stored.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(WardenError::InvalidPolicy(format!(
            "stored delimiter '{}' is not a single character",
            stored
        ))),
    }
}
