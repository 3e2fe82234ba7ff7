//! Sessions: named worlds behind opaque ids.
//!
//! A `Session` is an ordered map of worlds with a current selection; a
//! `SessionManager` hands out opaque hex ids for independent sessions.
//! Neither does any locking: the embedding serialises access per world.

use super::{World, WorldError};
use crate::hexidirect::{EngineRng, ParseError};
use crate::world_io::WorldIoError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// World metadata reported to embeddings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSummary {
    pub name: String,
    pub radius: i32,
    pub active_count: usize,
}

/// Error type for session-level operations.
#[derive(Debug)]
pub enum SessionError {
    /// Create/rename target already exists
    NameConflict(String),
    /// Select/rename/delete of an unknown world
    NotFound(String),
    /// An operation needed a selected world and none is
    NoWorldSelected,
    /// Cell-level failure from the world facade
    World(WorldError),
    /// Rule text failed to parse
    Parse(ParseError),
    /// Snapshot I/O failure
    Io(WorldIoError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NameConflict(name) => write!(f, "world `{}` already exists", name),
            SessionError::NotFound(name) => write!(f, "unknown world `{}`", name),
            SessionError::NoWorldSelected => write!(f, "no world selected"),
            SessionError::World(e) => write!(f, "{}", e),
            SessionError::Parse(e) => write!(f, "{}", e),
            SessionError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<WorldError> for SessionError {
    fn from(e: WorldError) -> Self {
        SessionError::World(e)
    }
}

impl From<ParseError> for SessionError {
    fn from(e: ParseError) -> Self {
        SessionError::Parse(e)
    }
}

impl From<WorldIoError> for SessionError {
    fn from(e: WorldIoError) -> Self {
        SessionError::Io(e)
    }
}

/// A set of named worlds with a current selection.
#[derive(Debug, Default)]
pub struct Session {
    worlds: BTreeMap<String, World>,
    current: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world under a unique name. The first world created becomes
    /// the selection.
    pub fn create_world(
        &mut self,
        name: &str,
        radius: i32,
        seed: u64,
    ) -> Result<&mut World, SessionError> {
        if self.worlds.contains_key(name) {
            return Err(SessionError::NameConflict(name.to_string()));
        }
        if self.current.is_none() {
            self.current = Some(name.to_string());
        }
        Ok(self
            .worlds
            .entry(name.to_string())
            .or_insert_with(|| World::new(name, radius, seed)))
    }

    /// Adopt an existing world (e.g. one restored from a snapshot).
    pub fn insert_world(&mut self, world: World) -> Result<(), SessionError> {
        let name = world.name().to_string();
        if self.worlds.contains_key(&name) {
            return Err(SessionError::NameConflict(name));
        }
        if self.current.is_none() {
            self.current = Some(name.clone());
        }
        self.worlds.insert(name, world);
        Ok(())
    }

    pub fn rename_world(&mut self, old: &str, new: &str) -> Result<(), SessionError> {
        if new.is_empty() || self.worlds.contains_key(new) {
            return Err(SessionError::NameConflict(new.to_string()));
        }
        let mut world = self
            .worlds
            .remove(old)
            .ok_or_else(|| SessionError::NotFound(old.to_string()))?;
        world.rename(new);
        self.worlds.insert(new.to_string(), world);
        if self.current.as_deref() == Some(old) {
            self.current = Some(new.to_string());
        }
        Ok(())
    }

    pub fn delete_world(&mut self, name: &str) -> Result<(), SessionError> {
        self.worlds
            .remove(name)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        Ok(())
    }

    pub fn select_world(&mut self, name: &str) -> Result<&mut World, SessionError> {
        match self.worlds.get_mut(name) {
            Some(world) => {
                self.current = Some(name.to_string());
                Ok(world)
            }
            None => Err(SessionError::NotFound(name.to_string())),
        }
    }

    /// Summaries of every world, in name order.
    pub fn list_worlds(&self) -> Vec<WorldSummary> {
        self.worlds
            .values()
            .map(|w| WorldSummary {
                name: w.name().to_string(),
                radius: w.radius(),
                active_count: w.active_count(),
            })
            .collect()
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Result<&World, SessionError> {
        let name = self.current.as_ref().ok_or(SessionError::NoWorldSelected)?;
        self.worlds
            .get(name)
            .ok_or_else(|| SessionError::NotFound(name.clone()))
    }

    pub fn current_mut(&mut self) -> Result<&mut World, SessionError> {
        let name = self
            .current
            .clone()
            .ok_or(SessionError::NoWorldSelected)?;
        self.worlds
            .get_mut(&name)
            .ok_or(SessionError::NotFound(name))
    }
}

/// Opaque session ids mapped to sessions.
pub struct SessionManager {
    sessions: HashMap<String, Session>,
    rng: EngineRng,
}

impl SessionManager {
    /// Manager with ids derived from a fixed seed; embeddings that need
    /// unpredictable ids pass entropy here.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            rng: EngineRng::from_seed(seed),
        }
    }

    /// Create a session and return its opaque id.
    pub fn create_session(&mut self) -> String {
        let id = format!("{:016x}{:016x}", self.rng.next_u64(), self.rng.next_u64());
        self.sessions.insert(id.clone(), Session::new());
        id
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn destroy_session(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
