use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{PlaylistAssignment, UserSettings};
use organizer::SettingsStore;
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition,
    TableError, TransactionError,
};
use serde::{Deserialize, Serialize};

const USER_SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("user_settings");
const ASSIGNMENTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("playlist_assignments");

const KEY_SEP: char = '\x1f';

#[derive(Clone)]
pub struct UserDataStore {
    db: Arc<Database>,
}

impl UserDataStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn init_tables(&self) -> Result<(), UserDataError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(USER_SETTINGS_TABLE)?;
            let _ = write_txn.open_table(ASSIGNMENTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, UserDataError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(USER_SETTINGS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let settings = match table.get(user_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(settings)
    }

    pub fn set_user_settings(&self, settings: &UserSettings) -> Result<(), UserDataError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_SETTINGS_TABLE)?;
            let bytes = encode_value(settings)?;
            table.insert(settings.user_id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn list_assignments(
        &self,
        user_id: &str,
    ) -> Result<Vec<PlaylistAssignment>, UserDataError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(ASSIGNMENTS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let prefix = prefix_key(user_id);
        let mut end = prefix.clone();
        end.push('\u{10ffff}');
        let mut items = Vec::new();
        for entry in table.range(prefix.as_str()..end.as_str())? {
            let entry = entry?;
            let assignment: PlaylistAssignment = decode_value(entry.1.value())?;
            items.push(assignment);
        }
        Ok(items)
    }

    pub fn get_assignment(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<PlaylistAssignment>, UserDataError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(ASSIGNMENTS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let key = assignment_key(user_id, playlist_id);
        let assignment = match table.get(key.as_str())? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(assignment)
    }

    pub fn put_assignment(&self, assignment: &PlaylistAssignment) -> Result<(), UserDataError> {
        let key = assignment_key(&assignment.user_id, &assignment.playlist_id);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ASSIGNMENTS_TABLE)?;
            let bytes = encode_value(assignment)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl SettingsStore for UserDataStore {
    type Error = UserDataError;

    fn user_settings(&self, user_id: &str) -> Result<UserSettings, Self::Error> {
        Ok(self
            .get_user_settings(user_id)?
            .unwrap_or_else(|| UserSettings::defaults(user_id)))
    }

    fn save_user_settings(&self, settings: &UserSettings) -> Result<(), Self::Error> {
        self.set_user_settings(settings)
    }

    fn playlist_assignments(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, PlaylistAssignment>, Self::Error> {
        Ok(self
            .list_assignments(user_id)?
            .into_iter()
            .map(|assignment| (assignment.playlist_id.clone(), assignment))
            .collect())
    }

    fn playlist_assignment(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Option<PlaylistAssignment>, Self::Error> {
        self.get_assignment(user_id, playlist_id)
    }

    fn upsert_playlist_assignment(
        &self,
        assignment: &PlaylistAssignment,
    ) -> Result<(), Self::Error> {
        self.put_assignment(assignment)
    }
}

fn prefix_key(user_id: &str) -> String {
    let mut out = String::with_capacity(user_id.len() + 1);
    out.push_str(user_id);
    out.push(KEY_SEP);
    out
}

fn assignment_key(user_id: &str, playlist_id: &str) -> String {
    let mut out = prefix_key(user_id);
    out.push_str(playlist_id);
    out
}

pub fn open_or_create_db(path: &Path) -> Result<Database, UserDataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

#[derive(Debug)]
pub enum UserDataError {
    Io(std::io::Error),
    Database(DatabaseError),
    Table(TableError),
    Transaction(TransactionError),
    Storage(StorageError),
    Commit(CommitError),
    Bincode(Box<bincode::ErrorKind>),
}

impl From<std::io::Error> for UserDataError {
    fn from(err: std::io::Error) -> Self {
        UserDataError::Io(err)
    }
}

impl From<DatabaseError> for UserDataError {
    fn from(err: DatabaseError) -> Self {
        UserDataError::Database(err)
    }
}

impl From<TableError> for UserDataError {
    fn from(err: TableError) -> Self {
        UserDataError::Table(err)
    }
}

impl From<TransactionError> for UserDataError {
    fn from(err: TransactionError) -> Self {
        UserDataError::Transaction(err)
    }
}

impl From<StorageError> for UserDataError {
    fn from(err: StorageError) -> Self {
        UserDataError::Storage(err)
    }
}

impl From<CommitError> for UserDataError {
    fn from(err: CommitError) -> Self {
        UserDataError::Commit(err)
    }
}

impl From<Box<bincode::ErrorKind>> for UserDataError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        UserDataError::Bincode(err)
    }
}

impl std::fmt::Display for UserDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserDataError::Io(err) => write!(f, "io error: {}", err),
            UserDataError::Database(err) => write!(f, "redb database error: {}", err),
            UserDataError::Table(err) => write!(f, "redb table error: {}", err),
            UserDataError::Transaction(err) => write!(f, "redb transaction error: {}", err),
            UserDataError::Storage(err) => write!(f, "redb storage error: {}", err),
            UserDataError::Commit(err) => write!(f, "redb commit error: {}", err),
            UserDataError::Bincode(err) => write!(f, "bincode error: {}", err),
        }
    }
}

impl std::error::Error for UserDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UserDataError::Io(err) => Some(err),
            UserDataError::Database(err) => Some(err),
            UserDataError::Table(err) => Some(err),
            UserDataError::Transaction(err) => Some(err),
            UserDataError::Storage(err) => Some(err),
            UserDataError::Commit(err) => Some(err),
            UserDataError::Bincode(err) => Some(err),
        }
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, UserDataError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, UserDataError> {
    Ok(bincode::deserialize(bytes)?)
}
