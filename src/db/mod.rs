use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub mod models;
use models::*;

/// Thread-safe SQLite store (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Snapshot ──────────────────────────────────────────────────────────────

    /// Replace the stored matches/projections with the output of a fresh
    /// aggregation pass. The whole swap runs in one transaction so readers
    /// never see a half-written snapshot.
    pub fn replace_snapshot(&self, matches: &[Match], projections: &[Projection]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM projections", [])?;
        tx.execute("DELETE FROM matches", [])?;

        for m in matches {
            tx.execute(
                "INSERT INTO matches (id, team1, team2, tournament, start_time,
                                      map1, map2, status)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![
                    m.id,
                    m.team1,
                    m.team2,
                    m.tournament,
                    m.start_time,
                    m.map1,
                    m.map2,
                    m.status.as_str(),
                ],
            )?;
        }

        for p in projections {
            let dfs_json = serde_json::to_string(&p.dfs_lines)
                .context("Failed to serialize DFS lines")?;
            tx.execute(
                "INSERT INTO projections (
                    match_id, player_name, team, stat_type, projected_value,
                    confidence, dfs_lines, value_opportunity, difference
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                params![
                    p.match_id,
                    p.player_name,
                    p.team,
                    p.stat_type,
                    p.projected_value,
                    p.confidence,
                    dfs_json,
                    p.value_opportunity,
                    p.difference,
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO refreshes (refreshed_at, match_count, projection_count)
             VALUES (?1, ?2, ?3)",
            params![Utc::now(), matches.len() as i64, projections.len() as i64],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// List all stored matches
    pub fn list_matches(&self) -> Result<Vec<Match>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, team1, team2, tournament, start_time, map1, map2, status
             FROM matches ORDER BY start_time ASC",
        )?;
        let matches = stmt
            .query_map([], map_match)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(matches)
    }

    /// List projections for one match
    pub fn list_projections_for_match(&self, match_id: &str) -> Result<Vec<Projection>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT match_id, player_name, team, stat_type, projected_value,
                    confidence, dfs_lines, value_opportunity, difference
             FROM projections WHERE match_id = ?1 ORDER BY player_name ASC",
        )?;
        let projections = stmt
            .query_map(params![match_id], map_projection)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projections)
    }

    /// Aggregate stats over the stored snapshot
    pub fn get_stats(&self) -> Result<SnapshotStats> {
        let conn = self.conn.lock().unwrap();
        let total_matches: i64 = conn
            .query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0))
            .unwrap_or(0);
        let total_projections: i64 = conn
            .query_row("SELECT COUNT(*) FROM projections", [], |r| r.get(0))
            .unwrap_or(0);
        let value_opportunities: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM projections WHERE value_opportunity = 1",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);
        let avg_confidence: f64 = conn
            .query_row(
                "SELECT COALESCE(AVG(confidence), 0) FROM projections",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0.0);
        let last_refresh: Option<DateTime<Utc>> = conn
            .query_row(
                "SELECT refreshed_at FROM refreshes ORDER BY refreshed_at DESC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .ok();
        Ok(SnapshotStats {
            total_matches,
            total_projections,
            value_opportunities,
            avg_confidence: (avg_confidence * 10.0).round() / 10.0,
            last_refresh,
        })
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_match(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    let status: String = row.get(7)?;
    Ok(Match {
        id: row.get(0)?,
        team1: row.get(1)?,
        team2: row.get(2)?,
        tournament: row.get(3)?,
        start_time: row.get(4)?,
        map1: row.get(5)?,
        map2: row.get(6)?,
        status: MatchStatus::parse(&status),
    })
}

fn map_projection(row: &rusqlite::Row) -> rusqlite::Result<Projection> {
    let dfs_json: String = row.get(6)?;
    let dfs_lines: Vec<DfsLine> = serde_json::from_str(&dfs_json).unwrap_or_default();
    Ok(Projection {
        match_id: row.get(0)?,
        player_name: row.get(1)?,
        team: row.get(2)?,
        stat_type: row.get(3)?,
        projected_value: row.get(4)?,
        confidence: row.get(5)?,
        dfs_lines,
        value_opportunity: row.get(7)?,
        difference: row.get(8)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS matches (
    id          TEXT    PRIMARY KEY,
    team1       TEXT    NOT NULL,
    team2       TEXT    NOT NULL,
    tournament  TEXT    NOT NULL,
    start_time  TEXT    NOT NULL,
    map1        TEXT    NOT NULL DEFAULT 'TBD',
    map2        TEXT    NOT NULL DEFAULT 'TBD',
    status      TEXT    NOT NULL DEFAULT 'upcoming'
);

CREATE TABLE IF NOT EXISTS projections (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id          TEXT    NOT NULL,
    player_name       TEXT    NOT NULL,
    team              TEXT    NOT NULL,
    stat_type         TEXT    NOT NULL,
    projected_value   REAL    NOT NULL,
    confidence        REAL    NOT NULL,
    dfs_lines         TEXT    NOT NULL,
    value_opportunity INTEGER NOT NULL DEFAULT 0,
    difference        REAL    NOT NULL DEFAULT 0,
    FOREIGN KEY (match_id) REFERENCES matches(id)
);

CREATE TABLE IF NOT EXISTS refreshes (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    refreshed_at     TEXT    NOT NULL,
    match_count      INTEGER NOT NULL,
    projection_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projections_match ON projections(match_id);
CREATE INDEX IF NOT EXISTS idx_projections_value ON projections(value_opportunity);
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_matches: i64,
    pub total_projections: i64,
    pub value_opportunities: i64,
    pub avg_confidence: f64,
    pub last_refresh: Option<DateTime<Utc>>,
}
