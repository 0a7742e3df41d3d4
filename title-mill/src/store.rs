use std::path::Path;

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Pattern, Result, Slot, Word};

/// Persistent word and pattern tables plus the ingestion watermark
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (and if necessary create) the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Number of posts already ingested, `0` for a fresh store
    pub fn watermark(&self) -> Result<u64> {
        let count = self
            .conn
            .query_row(
                "SELECT count FROM posts_count ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0) as u64)
    }

    /// Append a new watermark value; the latest one wins
    pub fn push_watermark(&self, count: u64) -> Result<()> {
        self.conn
            .execute("INSERT INTO posts_count (count) VALUES (?1)", [count as i64])?;
        Ok(())
    }

    /// Insert `words` in one transaction, replacing the category of known surfaces
    pub fn insert_words(&mut self, words: &[Word]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO words (surface, kind, subkind) VALUES (?1, ?2, ?3)
                 ON CONFLICT (surface) DO UPDATE SET kind = excluded.kind, subkind = excluded.subkind",
            )?;
            for word in words {
                stmt.execute(params![
                    word.surface.as_str(),
                    word.slot.kind.as_str(),
                    word.slot.subkind.as_str()
                ])?;
            }
        }
        tx.commit()?;
        debug!(words = words.len(), "stored words");
        Ok(())
    }

    /// Insert `patterns` in one transaction, ignoring ones already stored
    pub fn insert_patterns(&mut self, patterns: &[Pattern]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO patterns (slots) VALUES (?1)")?;
            for pattern in patterns.iter().filter(|p| !p.is_empty()) {
                stmt.execute([pattern.key()])?;
            }
        }
        tx.commit()?;
        debug!(patterns = patterns.len(), "stored patterns");
        Ok(())
    }

    pub fn word_count(&self) -> Result<usize> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get::<_, i64>(0))?;
        Ok(count as usize)
    }

    pub fn pattern_count(&self) -> Result<usize> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM patterns", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(count as usize)
    }

    pub fn words(&self) -> Result<Vec<Word>> {
        let mut stmt = self
            .conn
            .prepare("SELECT surface, kind, subkind FROM words ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let (surface, kind, subkind): (String, String, String) =
                (row.get(0)?, row.get(1)?, row.get(2)?);
            Ok(Word::new(&surface, &kind, &subkind))
        })?;

        let mut words = Vec::new();
        for row in rows {
            words.push(row?);
        }
        Ok(words)
    }

    pub fn patterns(&self) -> Result<Vec<Pattern>> {
        let mut stmt = self.conn.prepare("SELECT slots FROM patterns ORDER BY id")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        keys.iter().map(|key| key.parse()).collect()
    }

    /// Pick a stored pattern uniformly at random
    pub fn sample_pattern<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<Pattern>> {
        let count = self.pattern_count()?;
        if count == 0 {
            return Ok(None);
        }

        let offset = rng.gen_range(0..count) as i64;
        let key = self.conn.query_row(
            "SELECT slots FROM patterns ORDER BY id LIMIT 1 OFFSET ?1",
            [offset],
            |row| row.get::<_, String>(0),
        )?;
        Ok(Some(key.parse()?))
    }

    /// Pick a stored word of category `slot` uniformly at random
    pub fn sample_word<R: Rng + ?Sized>(&self, slot: &Slot, rng: &mut R) -> Result<Option<Word>> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM words WHERE kind = ?1 AND subkind = ?2",
            params![slot.kind.as_str(), slot.subkind.as_str()],
            |row| row.get::<_, i64>(0),
        )?;
        if count == 0 {
            return Ok(None);
        }

        let offset = rng.gen_range(0..count);
        let surface = self.conn.query_row(
            "SELECT surface FROM words WHERE kind = ?1 AND subkind = ?2
             ORDER BY id LIMIT 1 OFFSET ?3",
            params![slot.kind.as_str(), slot.subkind.as_str(), offset],
            |row| row.get::<_, String>(0),
        )?;
        Ok(Some(Word {
            surface: surface.as_str().into(),
            slot: slot.clone(),
        }))
    }

    /// Copy out the whole corpus
    #[cfg(feature = "with-serde")]
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            watermark: self.watermark()?,
            words: self.words()?,
            patterns: self.patterns()?,
        })
    }

    /// Merge a snapshot into this store
    ///
    /// The watermark is only moved forward, and only after words and patterns are stored.
    #[cfg(feature = "with-serde")]
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.insert_words(&snapshot.words)?;
        self.insert_patterns(&snapshot.patterns)?;
        if snapshot.watermark > self.watermark()? {
            self.push_watermark(snapshot.watermark)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Serializable copy of a store's contents
#[cfg(feature = "with-serde")]
#[derive(Debug, Deserialize, Serialize)]
pub struct Snapshot {
    pub watermark: u64,
    pub words: Vec<Word>,
    pub patterns: Vec<Pattern>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    surface TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    subkind TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS words_slot ON words (kind, subkind);
CREATE TABLE IF NOT EXISTS patterns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slots TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS posts_count (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    count INTEGER NOT NULL
);
";
