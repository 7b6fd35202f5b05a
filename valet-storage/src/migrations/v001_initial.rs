//! v001: episodes, facts, rules, memory_links, and their FTS5 indexes.

use rusqlite::Connection;

use valet_core::errors::MemoryResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> MemoryResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS episodes (
            id                 TEXT PRIMARY KEY,
            scope              TEXT NOT NULL,
            content            TEXT NOT NULL,
            source_session_id  TEXT,
            embedding          BLOB NOT NULL,
            dimensions         INTEGER NOT NULL,
            created_at         TEXT NOT NULL,
            expires_at         TEXT NOT NULL,
            consolidated       INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_episodes_scope ON episodes(scope);
        CREATE INDEX IF NOT EXISTS idx_episodes_expiry ON episodes(expires_at);
        CREATE INDEX IF NOT EXISTS idx_episodes_unconsolidated
            ON episodes(consolidated) WHERE consolidated = 0;

        CREATE VIRTUAL TABLE IF NOT EXISTS episode_fts USING fts5(content);

        CREATE TABLE IF NOT EXISTS facts (
            id                 TEXT PRIMARY KEY,
            subject            TEXT NOT NULL,
            predicate          TEXT NOT NULL,
            content            TEXT NOT NULL,
            scope              TEXT NOT NULL,
            confidence         REAL NOT NULL,
            permanence         TEXT NOT NULL,
            validity           TEXT NOT NULL,
            reference_count    INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            last_referenced_at TEXT NOT NULL,
            last_confirmed_at  TEXT NOT NULL,
            supersedes_id      TEXT,
            source_episode_id  TEXT,
            tags               TEXT NOT NULL DEFAULT '[]',
            embedding          BLOB NOT NULL,
            dimensions         INTEGER NOT NULL,
            content_hash       TEXT NOT NULL
        );

        -- At most one live fact per (subject, predicate, scope).
        -- Concurrent writers cannot race past the supersession check.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_facts_live_key
            ON facts(subject, predicate, scope)
            WHERE validity IN ('active', 'fading');

        CREATE INDEX IF NOT EXISTS idx_facts_scope ON facts(scope);
        CREATE INDEX IF NOT EXISTS idx_facts_validity ON facts(validity);

        CREATE VIRTUAL TABLE IF NOT EXISTS fact_fts
            USING fts5(content, subject, predicate);

        CREATE TABLE IF NOT EXISTS rules (
            id                 TEXT PRIMARY KEY,
            content            TEXT NOT NULL,
            scope              TEXT NOT NULL,
            confidence         REAL NOT NULL,
            maturity           TEXT NOT NULL,
            validity           TEXT NOT NULL,
            applied_count      INTEGER NOT NULL DEFAULT 0,
            success_count      INTEGER NOT NULL DEFAULT 0,
            harmful_count      INTEGER NOT NULL DEFAULT 0,
            effectiveness      REAL NOT NULL DEFAULT 0.0,
            reference_count    INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT NOT NULL,
            last_applied_at    TEXT,
            last_referenced_at TEXT NOT NULL,
            last_confirmed_at  TEXT NOT NULL,
            tags               TEXT NOT NULL DEFAULT '[]',
            embedding          BLOB NOT NULL,
            dimensions         INTEGER NOT NULL,
            content_hash       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_rules_scope ON rules(scope);
        CREATE INDEX IF NOT EXISTS idx_rules_validity ON rules(validity);

        CREATE VIRTUAL TABLE IF NOT EXISTS rule_fts USING fts5(content);

        CREATE TABLE IF NOT EXISTS memory_links (
            source_kind TEXT NOT NULL,
            source_id   TEXT NOT NULL,
            target_kind TEXT NOT NULL,
            target_id   TEXT NOT NULL,
            relation    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            PRIMARY KEY (source_kind, source_id, target_kind, target_id, relation)
        );

        CREATE INDEX IF NOT EXISTS idx_links_source ON memory_links(source_kind, source_id);
        CREATE INDEX IF NOT EXISTS idx_links_target ON memory_links(target_kind, target_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
