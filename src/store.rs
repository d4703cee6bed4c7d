use std::path::Path;

use rusqlite::{params, Connection};
use tracing::info;

use crate::config::MeetConfig;
use crate::error::Result;
use crate::model::{AthleteResult, Event, PartitionKey, WinnerRecord};

/// SQLite-backed results and winners tables. One database can hold any
/// number of meets; every write replaces the named meet's rows only, so
/// reprocessing a meet is reproducible without touching its neighbors.
pub struct ResultsStore {
    conn: Connection,
}

impl ResultsStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS results (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                state       TEXT,
                meet_name   TEXT NOT NULL,
                association TEXT,
                name        TEXT NOT NULL,
                gym         TEXT,
                session     TEXT,
                level       TEXT,
                division    TEXT,
                vault       REAL,
                bars        REAL,
                beam        REAL,
                floor       REAL,
                aa          REAL,
                vault_rank  INTEGER,
                bars_rank   INTEGER,
                beam_rank   INTEGER,
                floor_rank  INTEGER,
                aa_rank     INTEGER,
                rank        TEXT,
                num         TEXT
            );
            CREATE TABLE IF NOT EXISTS winners (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                state       TEXT,
                meet_name   TEXT NOT NULL,
                association TEXT,
                name        TEXT NOT NULL,
                gym         TEXT,
                session     TEXT,
                level       TEXT,
                division    TEXT,
                event       TEXT NOT NULL,
                score       REAL,
                is_tie      INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_results_meet
                ON results(meet_name, session, level, division);
            CREATE INDEX IF NOT EXISTS idx_winners_meet
                ON winners(meet_name, level, event);
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Replace the meet's result rows with the given batch.
    pub fn rebuild_results(
        &mut self,
        config: &MeetConfig,
        athletes: &[AthleteResult],
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM results WHERE meet_name = ?1",
            params![config.meet_name],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO results
                   (state, meet_name, association, name, gym, session, level, division,
                    vault, bars, beam, floor, aa,
                    vault_rank, bars_rank, beam_rank, floor_rank, aa_rank, rank, num)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            )?;
            for athlete in athletes {
                stmt.execute(params![
                    config.state,
                    config.meet_name,
                    config.association,
                    athlete.name,
                    athlete.gym,
                    athlete.session,
                    athlete.level,
                    athlete.division,
                    athlete.vault,
                    athlete.bars,
                    athlete.beam,
                    athlete.floor,
                    athlete.aa,
                    athlete.vault_rank,
                    athlete.bars_rank,
                    athlete.beam_rank,
                    athlete.floor_rank,
                    athlete.aa_rank,
                    athlete.rank,
                    athlete.num,
                ])?;
            }
        }
        tx.commit()?;
        info!(
            "Store: rebuilt results for {} with {} rows",
            config.meet_name,
            athletes.len()
        );
        Ok(athletes.len())
    }

    /// All result rows for a meet in insertion order.
    pub fn fetch_results(&self, meet_name: &str) -> Result<Vec<AthleteResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, gym, session, level, division,
                    vault, bars, beam, floor, aa,
                    vault_rank, bars_rank, beam_rank, floor_rank, aa_rank, rank, num
             FROM results WHERE meet_name = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![meet_name], |row| {
            Ok(AthleteResult {
                name: row.get(0)?,
                gym: row.get(1)?,
                session: row.get(2)?,
                level: row.get(3)?,
                division: row.get(4)?,
                vault: row.get(5)?,
                bars: row.get(6)?,
                beam: row.get(7)?,
                floor: row.get(8)?,
                aa: row.get(9)?,
                vault_rank: row.get(10)?,
                bars_rank: row.get(11)?,
                beam_rank: row.get(12)?,
                floor_rank: row.get(13)?,
                aa_rank: row.get(14)?,
                rank: row.get(15)?,
                num: row.get(16)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Distinct non-empty division labels for a meet, in first-appearance
    /// order.
    pub fn distinct_divisions(&self, meet_name: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT division FROM results
             WHERE meet_name = ?1 AND division <> ''
             GROUP BY division ORDER BY MIN(id)",
        )?;
        let rows = stmt.query_map(params![meet_name], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Replace the meet's winners table content.
    pub fn replace_winners(
        &mut self,
        config: &MeetConfig,
        winners: &[WinnerRecord],
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM winners WHERE meet_name = ?1",
            params![config.meet_name],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO winners
                   (state, meet_name, association, name, gym, session, level, division,
                    event, score, is_tie)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for winner in winners {
                stmt.execute(params![
                    config.state,
                    config.meet_name,
                    config.association,
                    winner.name,
                    winner.gym,
                    winner.partition.session,
                    winner.partition.level,
                    winner.partition.division,
                    winner.event.as_str(),
                    winner.score,
                    winner.is_tie,
                ])?;
            }
        }
        tx.commit()?;
        info!(
            "Store: replaced winners for {} with {} rows",
            config.meet_name,
            winners.len()
        );
        Ok(winners.len())
    }

    /// All winner rows for a meet in insertion order.
    pub fn fetch_winners(&self, meet_name: &str) -> Result<Vec<WinnerRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, gym, session, level, division, event, score, is_tie
             FROM winners WHERE meet_name = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![meet_name], |row| {
            let event_name: String = row.get(5)?;
            let event = Event::from_column(&event_name).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    format!("unknown event '{event_name}' in winners table").into(),
                )
            })?;
            Ok(WinnerRecord {
                name: row.get(0)?,
                gym: row.get(1)?,
                partition: PartitionKey {
                    session: row.get(2)?,
                    level: row.get(3)?,
                    division: row.get(4)?,
                },
                event,
                score: row.get(6)?,
                is_tie: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete both tables' rows for a meet. Returns (results, winners)
    /// counts removed.
    pub fn clear_meet(&mut self, meet_name: &str) -> Result<(usize, usize)> {
        let tx = self.conn.transaction()?;
        let results = tx.execute(
            "DELETE FROM results WHERE meet_name = ?1",
            params![meet_name],
        )?;
        let winners = tx.execute(
            "DELETE FROM winners WHERE meet_name = ?1",
            params![meet_name],
        )?;
        tx.commit()?;
        info!("Store: cleared {meet_name} ({results} results, {winners} winners)");
        Ok((results, winners))
    }

    pub fn count_results(&self, meet_name: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE meet_name = ?1",
            params![meet_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_winners(&self, meet_name: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM winners WHERE meet_name = ?1",
            params![meet_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
