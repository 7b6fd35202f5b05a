//! StorageEngine: owns the ConnectionPool, implements `MemoryStore`,
//! runs migrations on startup.

use std::path::Path;

use chrono::{DateTime, Utc};

use valet_core::memory::{EntityKind, Episode, Fact, MemoryLink, Rule, Validity};
use valet_core::models::{BatchOutcome, PreparedBatch, StatsReport};
use valet_core::traits::MemoryStore;
use valet_core::MemoryResult;

use crate::migrations;
use crate::pool::ConnectionPool;

/// The main storage engine. Owns the connection pool and provides the
/// full `MemoryStore` interface.
pub struct StorageEngine {
    pool: ConnectionPool,
    /// When true, use the read pool for read operations (file-backed
    /// mode). When false, route all reads through the writer
    /// (in-memory mode, because in-memory read pool connections are
    /// isolated databases).
    use_read_pool: bool,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path) -> MemoryResult<Self> {
        let pool = ConnectionPool::open(path, 4)?;
        let engine = Self {
            pool,
            use_read_pool: true,
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing). Routes all
    /// reads through the writer.
    pub fn open_in_memory() -> MemoryResult<Self> {
        let pool = ConnectionPool::open_in_memory(1)?;
        let engine = Self {
            pool,
            use_read_pool: false,
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Run migrations on the writer.
    fn initialize(&self) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| migrations::run_migrations(conn))
    }

    /// Get a reference to the connection pool (for advanced operations).
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Execute a read-only query on the best available connection.
    fn with_reader<F, T>(&self, f: F) -> MemoryResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> MemoryResult<T>,
    {
        if self.use_read_pool {
            self.pool.readers.with_conn(f)
        } else {
            self.pool.writer.with_conn_sync(f)
        }
    }
}

impl MemoryStore for StorageEngine {
    fn insert_episode(&self, episode: &Episode) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::episode_ops::insert_episode(conn, episode))
    }

    fn get_episode(&self, id: &str) -> MemoryResult<Option<Episode>> {
        self.with_reader(|conn| crate::queries::episode_ops::get_episode(conn, id))
    }

    fn unconsolidated_episodes(&self) -> MemoryResult<Vec<Episode>> {
        self.with_reader(crate::queries::episode_ops::unconsolidated_episodes)
    }

    fn episode_count(&self) -> MemoryResult<usize> {
        self.with_reader(crate::queries::episode_ops::episode_count)
    }

    fn delete_expired_episodes(
        &self,
        now: DateTime<Utc>,
        hard_cap_cutoff: DateTime<Utc>,
    ) -> MemoryResult<(usize, usize)> {
        self.pool.writer.with_conn_sync(|conn| {
            crate::queries::episode_ops::delete_expired(conn, now, hard_cap_cutoff)
        })
    }

    fn evict_oldest_consolidated(&self, excess: usize) -> MemoryResult<usize> {
        self.pool.writer.with_conn_sync(|conn| {
            crate::queries::episode_ops::evict_oldest_consolidated(conn, excess)
        })
    }

    fn insert_fact(&self, fact: &Fact) -> MemoryResult<Option<String>> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::fact_ops::insert_fact(conn, fact))
    }

    fn get_fact(&self, id: &str) -> MemoryResult<Option<Fact>> {
        self.with_reader(|conn| crate::queries::fact_ops::get_fact(conn, id))
    }

    fn active_facts(&self, scope: Option<&str>) -> MemoryResult<Vec<Fact>> {
        self.with_reader(|conn| crate::queries::fact_ops::active_facts(conn, scope))
    }

    fn live_facts(&self) -> MemoryResult<Vec<Fact>> {
        self.with_reader(crate::queries::fact_ops::live_facts)
    }

    fn set_fact_validity(&self, id: &str, validity: Validity) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::fact_ops::set_validity(conn, id, validity))
    }

    fn confirm_fact(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<Fact> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::fact_ops::confirm_fact(conn, id, now))
    }

    fn bump_fact_reference(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::fact_ops::bump_reference(conn, id, now))
    }

    fn insert_rule(&self, rule: &Rule) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::rule_ops::insert_rule(conn, rule))
    }

    fn get_rule(&self, id: &str) -> MemoryResult<Option<Rule>> {
        self.with_reader(|conn| crate::queries::rule_ops::get_rule(conn, id))
    }

    fn update_rule(&self, rule: &Rule) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::rule_ops::update_rule(conn, rule))
    }

    fn active_rules(&self, scope: Option<&str>) -> MemoryResult<Vec<Rule>> {
        self.with_reader(|conn| crate::queries::rule_ops::active_rules(conn, scope))
    }

    fn live_rules(&self) -> MemoryResult<Vec<Rule>> {
        self.with_reader(crate::queries::rule_ops::live_rules)
    }

    fn set_rule_validity(&self, id: &str, validity: Validity) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::rule_ops::set_validity(conn, id, validity))
    }

    fn confirm_rule(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<Rule> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::rule_ops::confirm_rule(conn, id, now))
    }

    fn bump_rule_reference(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::rule_ops::bump_reference(conn, id, now))
    }

    fn create_link(&self, link: &MemoryLink) -> MemoryResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::link_ops::create_link(conn, link))
    }

    fn links_for(&self, kind: EntityKind, id: &str) -> MemoryResult<Vec<MemoryLink>> {
        self.with_reader(|conn| crate::queries::link_ops::links_for(conn, kind, id))
    }

    fn keyword_search(
        &self,
        kind: EntityKind,
        query: &str,
        scope: Option<&str>,
        limit: usize,
    ) -> MemoryResult<Vec<String>> {
        self.with_reader(|conn| {
            crate::queries::text_search::keyword_search(conn, kind, query, scope, limit)
        })
    }

    fn semantic_search(
        &self,
        kind: EntityKind,
        embedding: &[f32],
        scope: Option<&str>,
        limit: usize,
    ) -> MemoryResult<Vec<(String, f64)>> {
        self.with_reader(|conn| {
            crate::queries::vector_search::semantic_search(conn, kind, embedding, scope, limit)
        })
    }

    fn apply_batch(&self, batch: &PreparedBatch) -> MemoryResult<BatchOutcome> {
        self.pool
            .writer
            .with_conn_sync(|conn| crate::queries::consolidation_ops::apply_batch(conn, batch))
    }

    fn stats(&self) -> MemoryResult<StatsReport> {
        self.with_reader(crate::queries::aggregation::stats)
    }
}
