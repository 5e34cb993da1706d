//! Server state and the in-memory person store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::config::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Person records
    pub persons: PersonStore,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            persons: PersonStore::new(),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// A stored person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Store-assigned identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// Contact address
    pub email: Option<String>,
}

/// Attribute changes applied by an update. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct PersonChanges {
    /// New name
    pub name: Option<String>,
    /// New email; `Some(None)` clears it
    pub email: Option<Option<String>>,
}

/// Person records keyed by id, in id order.
pub struct PersonStore {
    persons: RwLock<BTreeMap<u64, Person>>,
    next_id: AtomicU64,
}

impl Default for PersonStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            persons: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a new person and return it with its assigned id
    pub async fn create(&self, name: String, email: Option<String>) -> Person {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let person = Person { id, name, email };
        self.persons.write().await.insert(id, person.clone());
        person
    }

    /// Get person by id
    pub async fn get(&self, id: u64) -> Option<Person> {
        self.persons.read().await.get(&id).cloned()
    }

    /// All persons, ordered by id
    pub async fn list(&self) -> Vec<Person> {
        self.persons.read().await.values().cloned().collect()
    }

    /// Apply changes to an existing person
    pub async fn update(&self, id: u64, changes: PersonChanges) -> Option<Person> {
        let mut persons = self.persons.write().await;
        let person = persons.get_mut(&id)?;

        if let Some(name) = changes.name {
            person.name = name;
        }
        if let Some(email) = changes.email {
            person.email = email;
        }

        Some(person.clone())
    }

    /// Remove a person; `false` if the id was unknown
    pub async fn remove(&self, id: u64) -> bool {
        self.persons.write().await.remove(&id).is_some()
    }

    /// Get person count
    pub async fn count(&self) -> usize {
        self.persons.read().await.len()
    }
}
