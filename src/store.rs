//! Persistent lap record storage, backed by a single SQLite table keyed
//! on `(driver_guid, track_name, track_config, perf_class)`.
//!
//! `perf_class` is the car model after [`class_map::class_of`] has
//! collapsed it, so GT4 chassis all share one row per driver/track
//! rather than one each.

use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::class_map::class_of;

/// One stored personal-record lap.
#[derive(Debug, Clone, PartialEq)]
pub struct LapRecord {
    pub driver_guid: String,
    pub track_name: String,
    pub track_config: String,
    pub perf_class: String,
    pub car: String,
    pub driver_name: String,
    pub lap_time_ms: u32,
    pub grip_level: f32,
    pub timestamp: String,
}

/// The SQLite-backed personal-record / server-record store.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the database at `path`, ensuring the schema
    /// exists.
    pub fn open(path: &str) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Wrap an already-open connection, creating the schema if absent.
    /// Used directly by tests against an in-memory or temp-file database.
    pub fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS lap_personal_records (
                driver_guid  TEXT NOT NULL,
                track_name   TEXT NOT NULL,
                track_config TEXT NOT NULL,
                perf_class   TEXT NOT NULL,
                car          TEXT NOT NULL,
                driver_name  TEXT NOT NULL,
                lap_time_ms  INTEGER NOT NULL,
                grip_level   REAL NOT NULL,
                timestamp    TEXT NOT NULL,
                PRIMARY KEY (driver_guid, track_name, track_config, perf_class)
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// A driver's personal-record lap for a track/config/car, if one is
    /// on record. `car_model` is collapsed through the class map before
    /// lookup.
    pub fn get_pb(
        &self,
        driver_guid: &str,
        track_name: &str,
        track_config: &str,
        car_model: &str,
    ) -> rusqlite::Result<Option<LapRecord>> {
        let perf_class = class_of(car_model);
        self.conn
            .query_row(
                "SELECT driver_guid, track_name, track_config, perf_class, car,
                        driver_name, lap_time_ms, grip_level, timestamp
                 FROM lap_personal_records
                 WHERE driver_guid = ?1 AND track_name = ?2 AND track_config = ?3
                   AND perf_class = ?4",
                params![driver_guid, track_name, track_config, perf_class],
                row_to_record,
            )
            .optional()
    }

    /// Record a lap as the driver's PB if it beats their existing one
    /// (or they have none yet). Returns the diff in milliseconds between
    /// `lap_time_ms` and the previous PB: negative means an improvement,
    /// and the diff equals `lap_time_ms` itself when this is the
    /// driver's first recorded lap on this track/config/class.
    ///
    /// A lap equal to the existing PB is not an improvement (`diff` is
    /// zero) and the stored row is left untouched.
    pub fn record_pb(
        &self,
        driver_guid: &str,
        track_name: &str,
        track_config: &str,
        driver_name: &str,
        lap_time_ms: u32,
        car_model: &str,
        grip_level: f32,
    ) -> rusqlite::Result<i64> {
        let perf_class = class_of(car_model);
        let existing = self.get_pb(driver_guid, track_name, track_config, car_model)?;

        let diff = match &existing {
            None => lap_time_ms as i64,
            Some(record) => lap_time_ms as i64 - record.lap_time_ms as i64,
        };

        if existing.is_none() || diff < 0 {
            let timestamp = now_rfc3339();
            self.conn.execute(
                "DELETE FROM lap_personal_records
                 WHERE driver_guid = ?1 AND track_name = ?2 AND track_config = ?3
                   AND perf_class = ?4",
                params![driver_guid, track_name, track_config, perf_class],
            )?;
            self.conn.execute(
                "INSERT INTO lap_personal_records
                    (driver_guid, track_name, track_config, perf_class, car,
                     driver_name, lap_time_ms, grip_level, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    driver_guid,
                    track_name,
                    track_config,
                    perf_class,
                    car_model,
                    driver_name,
                    lap_time_ms,
                    grip_level,
                    timestamp,
                ],
            )?;
        }

        Ok(diff)
    }

    /// Compare `lap_time_ms` to the current fastest recorded lap for
    /// this track/config/class (the server record), across all
    /// drivers. Returns the diff in milliseconds: negative means this
    /// lap is faster than the server record, and the diff equals
    /// `lap_time_ms` itself when no server record exists yet.
    ///
    /// Callers that also update the PB should call this *before*
    /// [`record_pb`](Self::record_pb): comparing against a snapshot
    /// taken before the driver's own lap is admitted keeps the SR diff
    /// meaningful even when the driver who set it also holds the SR.
    pub fn compare_to_server_record(
        &self,
        track_name: &str,
        track_config: &str,
        car_model: &str,
        lap_time_ms: u32,
    ) -> rusqlite::Result<i64> {
        let perf_class = class_of(car_model);
        let fastest: Option<u32> = self
            .conn
            .query_row(
                "SELECT lap_time_ms FROM lap_personal_records
                 WHERE track_name = ?1 AND track_config = ?2 AND perf_class = ?3
                 ORDER BY lap_time_ms ASC LIMIT 1",
                params![track_name, track_config, perf_class],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match fastest {
            None => lap_time_ms as i64,
            Some(sr) => lap_time_ms as i64 - sr as i64,
        })
    }

    /// The top `limit` fastest laps for a track/config/car, fastest
    /// first.
    pub fn top_records(
        &self,
        track_name: &str,
        track_config: &str,
        car_model: &str,
        limit: u32,
    ) -> rusqlite::Result<Vec<LapRecord>> {
        let perf_class = class_of(car_model);
        let mut stmt = self.conn.prepare(
            "SELECT driver_guid, track_name, track_config, perf_class, car,
                    driver_name, lap_time_ms, grip_level, timestamp
             FROM lap_personal_records
             WHERE track_name = ?1 AND track_config = ?2 AND perf_class = ?3
             ORDER BY lap_time_ms ASC LIMIT ?4",
        )?;
        let rows = stmt.query_map(params![track_name, track_config, perf_class, limit], |row| {
            row_to_record(row)
        })?;
        rows.collect()
    }

    /// The most recently broken record on each track/config/class,
    /// newest first, capped at `limit` rows. Since only the current
    /// fastest lap is retained per key, this reports at most one row
    /// per track/config/class.
    pub fn recent_broken_records(&self, limit: u32) -> rusqlite::Result<Vec<LapRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.driver_guid, r.track_name, r.track_config, r.perf_class, r.car,
                    r.driver_name, r.lap_time_ms, r.grip_level, r.timestamp
             FROM lap_personal_records r
             INNER JOIN (
                 SELECT track_name, track_config, perf_class, MIN(lap_time_ms) AS lap_record
                 FROM lap_personal_records
                 GROUP BY track_name, track_config, perf_class
             ) sub
             ON r.track_name = sub.track_name
                AND r.track_config = sub.track_config
                AND r.perf_class = sub.perf_class
                AND r.lap_time_ms = sub.lap_record
             ORDER BY r.timestamp DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], row_to_record)?;
        rows.collect()
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<LapRecord> {
    Ok(LapRecord {
        driver_guid: row.get(0)?,
        track_name: row.get(1)?,
        track_config: row.get(2)?,
        perf_class: row.get(3)?,
        car: row.get(4)?,
        driver_name: row.get(5)?,
        lap_time_ms: row.get(6)?,
        grip_level: row.get(7)?,
        timestamp: row.get(8)?,
    })
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RecordStore {
        RecordStore::from_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn first_lap_is_its_own_diff_and_is_stored() {
        let store = store();
        let diff = store
            .record_pb("G1", "monza", "", "Driver", 90_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        assert_eq!(diff, 90_000);
        let pb = store.get_pb("G1", "monza", "", "gt4_bmw_m4").unwrap().unwrap();
        assert_eq!(pb.lap_time_ms, 90_000);
        assert_eq!(pb.perf_class, "gt4");
    }

    #[test]
    fn faster_lap_replaces_pb_with_negative_diff() {
        let store = store();
        store
            .record_pb("G1", "monza", "", "Driver", 90_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        let diff = store
            .record_pb("G1", "monza", "", "Driver", 89_500, "gt4_bmw_m4", 1.0)
            .unwrap();
        assert_eq!(diff, -500);
        let pb = store.get_pb("G1", "monza", "", "gt4_bmw_m4").unwrap().unwrap();
        assert_eq!(pb.lap_time_ms, 89_500);
    }

    #[test]
    fn slower_lap_is_not_stored() {
        let store = store();
        store
            .record_pb("G1", "monza", "", "Driver", 90_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        let diff = store
            .record_pb("G1", "monza", "", "Driver", 91_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        assert_eq!(diff, 1000);
        let pb = store.get_pb("G1", "monza", "", "gt4_bmw_m4").unwrap().unwrap();
        assert_eq!(pb.lap_time_ms, 90_000);
    }

    #[test]
    fn equal_lap_is_not_an_improvement() {
        let store = store();
        store
            .record_pb("G1", "monza", "", "Driver", 90_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        let diff = store
            .record_pb("G1", "monza", "", "Driver", 90_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        assert_eq!(diff, 0);
    }

    #[test]
    fn gt4_cars_share_a_pb_slot() {
        let store = store();
        store
            .record_pb("G1", "monza", "", "Driver", 90_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        let pb = store
            .get_pb("G1", "monza", "", "gt4_audi_r8")
            .unwrap()
            .unwrap();
        assert_eq!(pb.lap_time_ms, 90_000);
    }

    #[test]
    fn compare_to_server_record_with_no_records_returns_laptime() {
        let store = store();
        let diff = store
            .compare_to_server_record("monza", "", "gt4_bmw_m4", 90_000)
            .unwrap();
        assert_eq!(diff, 90_000);
    }

    #[test]
    fn compare_to_server_record_against_another_driver() {
        let store = store();
        store
            .record_pb("G1", "monza", "", "Driver1", 90_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        let diff = store
            .compare_to_server_record("monza", "", "gt4_bmw_m4", 89_000)
            .unwrap();
        assert_eq!(diff, -1000);
    }

    #[test]
    fn top_records_orders_fastest_first() {
        let store = store();
        store
            .record_pb("G1", "monza", "", "D1", 91_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        store
            .record_pb("G2", "monza", "", "D2", 89_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        let top = store.top_records("monza", "", "gt4_bmw_m4", 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].lap_time_ms, 89_000);
        assert_eq!(top[1].lap_time_ms, 91_000);
    }

    #[test]
    fn recent_broken_records_reports_one_row_per_key() {
        let store = store();
        store
            .record_pb("G1", "monza", "", "D1", 91_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        store
            .record_pb("G2", "monza", "", "D2", 89_000, "gt4_bmw_m4", 1.0)
            .unwrap();
        let recent = store.recent_broken_records(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].lap_time_ms, 89_000);
    }
}
