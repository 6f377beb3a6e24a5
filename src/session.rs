//! In-memory state threaded through the event pipeline: the current
//! session's track/config, and the table of connected cars.
//!
//! Neither type is a singleton. The binary owns one [`PipelineContext`]
//! and passes it by `&mut` into the pipeline on every datagram, which
//! keeps the whole crate testable without a process-wide `static`.

use fnv::FnvHashMap;
use log::debug;

use crate::protocol::{ConnectionClosed, NewConnection, NewSession};
use crate::store::RecordStore;

/// The track/config of the session currently in progress, if a
/// `NewSession` datagram has been seen yet.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionState {
    track_name: Option<String>,
    track_config: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the track/config announced by a `NewSession` datagram.
    pub fn set_session(&mut self, session: &NewSession) {
        self.track_name = Some(session.track_name.clone());
        self.track_config = Some(session.track_config.clone());
    }

    /// The current `(track_name, track_config)`, if known.
    pub fn current(&self) -> Option<(&str, &str)> {
        match (&self.track_name, &self.track_config) {
            (Some(name), Some(config)) => Some((name.as_str(), config.as_str())),
            _ => None,
        }
    }
}

/// Cars currently connected to the session, keyed by their server-issued
/// `car_id`.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    cars: FnvHashMap<u8, NewConnection>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a car's connection record.
    pub fn insert(&mut self, connection: NewConnection) {
        self.cars.insert(connection.car_id, connection);
    }

    /// Remove a car's connection record. Returns the removed record, if
    /// one was present.
    ///
    /// The table is keyed by `car_id` alone, since a reconnect under the
    /// same id always supersedes the previous entry.
    pub fn remove(&mut self, closed: &ConnectionClosed) -> Option<NewConnection> {
        let removed = self.cars.remove(&closed.car_id);
        if removed.is_none() {
            debug!(
                "connection closed for car_id {} with no matching entry",
                closed.car_id
            );
        }
        removed
    }

    /// Look up a connected car by id.
    pub fn get(&self, car_id: u8) -> Option<&NewConnection> {
        self.cars.get(&car_id)
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }
}

/// Everything the event pipeline needs to process one datagram: the
/// session/connection state, plus the persistent record store.
pub struct PipelineContext {
    pub session: SessionState,
    pub connections: ConnectionTable,
    pub store: RecordStore,
}

impl PipelineContext {
    pub fn new(store: RecordStore) -> Self {
        Self {
            session: SessionState::new(),
            connections: ConnectionTable::new(),
            store,
        }
    }
}
