//! Key-value app settings.
//!
//! # Responsibility
//! - Store profile fields and the first-launch flag.
//! - Stay a plain service object passed by reference; there is no global
//!   settings singleton.
//!
//! # Invariants
//! - Missing keys read as `None`; callers own defaults.
//! - Booleans are stored as `true`/`false` text and any other value is
//!   reported as invalid data.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Display name key.
pub const KEY_USER_NAME: &str = "user_name";
/// Email key.
pub const KEY_USER_EMAIL: &str = "user_email";
/// Bio key.
pub const KEY_USER_BIO: &str = "user_bio";
/// First-launch flag key.
pub const KEY_IS_FIRST_LAUNCH: &str = "is_first_launch";

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug)]
pub enum SettingsError {
    Db(DbError),
    InvalidData { key: String, value: String },
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData { key, value } => {
                write!(f, "invalid setting value `{value}` for key `{key}`")
            }
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for SettingsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// String/boolean key-value store.
pub trait SettingsStore {
    fn get_string(&self, key: &str) -> SettingsResult<Option<String>>;
    fn set_string(&self, key: &str, value: &str) -> SettingsResult<()>;

    fn get_bool(&self, key: &str) -> SettingsResult<Option<bool>> {
        match self.get_string(key)? {
            None => Ok(None),
            Some(value) => match value.as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(SettingsError::InvalidData {
                    key: key.to_string(),
                    value,
                }),
            },
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> SettingsResult<()> {
        self.set_string(key, if value { "true" } else { "false" })
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for &T {
    fn get_string(&self, key: &str) -> SettingsResult<Option<String>> {
        (**self).get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> SettingsResult<()> {
        (**self).set_string(key, value)
    }
}

/// Settings persisted in the `app_settings` table.
pub struct SqliteSettingsStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SettingsStore for SqliteSettingsStore<'_> {
    fn get_string(&self, key: &str) -> SettingsResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_string(&self, key: &str, value: &str) -> SettingsResult<()> {
        self.conn.execute(
            "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Volatile settings for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: RefCell<BTreeMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get_string(&self, key: &str) -> SettingsResult<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> SettingsResult<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
