use crate::login::hash_password;
use crate::records::{Record, RecordFields};
use crate::reconcile::RecordSink;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A registered application user
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// Numeric user id, assigned on registration
    pub id: i64,

    /// Username (unique identifier for the user)
    pub username: String,

    /// Email address (unique across users)
    pub email: String,

    /// Argon2 hash of the user's password
    pub password_hash: String,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

/// On-disk shape of the database file: both tables in one JSON document
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    users: HashMap<String, User>,
    employees: Vec<Record>,
}

/// Persistent store for the users and employees tables
///
/// The whole state lives in one JSON file at the configured database path
/// and is rewritten after every mutation. Each operation takes the lock
/// once, so individual requests are atomic at the store level; there is no
/// cross-request coordination beyond that.
pub struct DataStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl DataStore {
    /// Open the database file, creating and seeding it on first use
    ///
    /// A fresh database gets the five sample employees and a default
    /// `admin` user so the application is usable out of the box.
    ///
    /// # Arguments
    /// * `path` - Location of the JSON database file
    ///
    /// # Errors
    /// * Returns an error if the file cannot be read, parsed, or created
    pub fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let mut file = match File::open(&path) {
                Ok(file) => file,
                Err(_) => return Err("Failed to open database file".to_string()),
            };
            let mut contents = String::new();
            if file.read_to_string(&mut contents).is_err() {
                return Err("Failed to read database file".to_string());
            }
            match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(_) => return Err("Failed to parse database file".to_string()),
            }
        } else {
            let mut state = StoreState::default();
            seed_employees(&mut state);
            seed_admin_user(&mut state)?;
            state
        };

        let store = DataStore {
            path,
            state: RwLock::new(state),
        };
        store.persist(&store.state.read().unwrap())?;
        Ok(store)
    }

    /// Write the full state back to the database file
    fn persist(&self, state: &StoreState) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && create_dir_all(parent).is_err() {
                return Err("Failed to create database directory".to_string());
            }
        }

        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(_) => return Err("Failed to serialize database".to_string()),
        };

        let mut file = match File::create(&self.path) {
            Ok(file) => file,
            Err(_) => return Err("Failed to create database file".to_string()),
        };

        if file.write_all(json.as_bytes()).is_err() {
            return Err("Failed to write database file".to_string());
        }

        Ok(())
    }

    /// Insert a new user with an already-hashed password
    ///
    /// # Errors
    /// * Returns an error if the username or email is already registered
    pub fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, String> {
        let mut state = self.state.write().unwrap();

        if state.users.contains_key(username) {
            return Err("Username already registered".to_string());
        }
        if state.users.values().any(|user| user.email == email) {
            return Err("Email already registered".to_string());
        }

        let id = state.users.values().map(|user| user.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(username.to_string(), user);

        self.persist(&state)?;
        Ok(id)
    }

    /// Look up a user by username
    pub fn find_user(&self, username: &str) -> Option<User> {
        let state = self.state.read().unwrap();
        state.users.get(username).cloned()
    }

    /// Look up a user by id
    pub fn user_by_id(&self, id: i64) -> Option<User> {
        let state = self.state.read().unwrap();
        state.users.values().find(|user| user.id == id).cloned()
    }

    /// All employee records, ordered by id
    pub fn list_records(&self) -> Vec<Record> {
        let state = self.state.read().unwrap();
        let mut records = state.employees.clone();
        records.sort_by_key(|record| record.id);
        records
    }

    /// Insert a new record and return its assigned id
    ///
    /// The id is always freshly generated as `max(id) + 1`; any id the
    /// caller supplied is ignored.
    pub fn create_record(&self, fields: &RecordFields) -> Result<i64, String> {
        let mut state = self.state.write().unwrap();

        let next_id = state
            .employees
            .iter()
            .filter_map(|record| record.id)
            .max()
            .unwrap_or(0)
            + 1;
        state
            .employees
            .push(Record::new(next_id, fields.normalized()));

        self.persist(&state)?;
        Ok(next_id)
    }

    /// Overwrite the tracked fields of an existing record
    ///
    /// # Returns
    /// * `Ok(true)` if the record was updated, `Ok(false)` if the id is
    ///   unknown
    pub fn update_record(&self, id: i64, fields: &RecordFields) -> Result<bool, String> {
        let mut state = self.state.write().unwrap();

        let Some(record) = state
            .employees
            .iter_mut()
            .find(|record| record.id == Some(id))
        else {
            return Ok(false);
        };
        record.fields = fields.normalized();

        self.persist(&state)?;
        Ok(true)
    }

    /// Delete a record by id
    ///
    /// # Returns
    /// * `Ok(true)` if the record was deleted, `Ok(false)` if the id is
    ///   unknown
    pub fn delete_record(&self, id: i64) -> Result<bool, String> {
        let mut state = self.state.write().unwrap();

        let before = state.employees.len();
        state.employees.retain(|record| record.id != Some(id));
        if state.employees.len() == before {
            return Ok(false);
        }

        self.persist(&state)?;
        Ok(true)
    }
}

/// The store is a reconciliation sink: updates, inserts, and deletes map
/// straight onto the record operations, with unknown ids reported as errors
/// so an in-process dispatch aborts the way a failed HTTP call would.
impl RecordSink for DataStore {
    fn apply_update(&self, id: i64, data: &RecordFields) -> Result<(), String> {
        match self.update_record(id, data)? {
            true => Ok(()),
            false => Err("Record not found".to_string()),
        }
    }

    fn apply_insert(&self, data: &RecordFields) -> Result<i64, String> {
        self.create_record(data)
    }

    fn apply_delete(&self, id: i64) -> Result<(), String> {
        match self.delete_record(id)? {
            true => Ok(()),
            false => Err("Record not found".to_string()),
        }
    }
}

fn seed_employees(state: &mut StoreState) {
    let sample = [
        (1, "Paul Smith", 32, "paul@example.com", "Engineering"),
        (2, "Lisa Wong", 28, "lisa@example.com", "Design"),
        (3, "Tom Chen", 45, "tom@example.com", "Management"),
        (4, "Anna Lee", 29, "anna@example.com", "Marketing"),
        (5, "David Kim", 38, "david@example.com", "Sales"),
    ];

    for (id, name, age, email, department) in sample {
        state.employees.push(Record::new(
            id,
            RecordFields {
                name: name.to_string(),
                age: Some(age),
                email: email.to_string(),
                department: department.to_string(),
            },
        ));
    }
    info!("Sample data inserted");
}

fn seed_admin_user(state: &mut StoreState) -> Result<(), String> {
    let username = "admin";
    let password_hash = hash_password("admin123")?;

    state.users.insert(
        username.to_string(),
        User {
            id: 1,
            username: username.to_string(),
            email: "admin@example.com".to_string(),
            password_hash,
            created_at: Utc::now(),
        },
    );
    info!("Default admin user created: {username}");
    Ok(())
}
