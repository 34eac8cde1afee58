//! Roster of known users kept in a CSV file.
//!
//! Every call opens the file fresh, works on an in-memory [`Sheet`] and (for
//! writes) persists it again. Callers that may run concurrently must
//! serialize writes themselves, see [`crate::lock::RosterLock`].

pub mod cell;
pub mod reconcile;
pub mod sheet;
pub mod store;

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::user::UserRecord;

pub use cell::Cell;
pub use reconcile::{Field, HeaderIndexes, UpsertOutcome, DEFAULT_HEADERS};
pub use sheet::{Row, Sheet};

/// File-backed roster.
#[derive(Debug, Clone)]
pub struct Roster {
    path: PathBuf,
}

impl Roster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `user` in the roster, filling only blank cells of a matching row
    /// or appending a new one.
    pub fn upsert(&self, user: &UserRecord) -> Result<UpsertOutcome> {
        if !user.is_valid() {
            warn!("Cannot record a user without username or chat_id");
            return Err(Error::InvalidInput(
                "user record has neither a username nor a chat_id".to_string(),
            ));
        }

        let mut sheet = store::open_for_update(&self.path).inspect_err(|err| {
            error!(path = %self.path.display(), "Failed to open roster: {}", err);
        })?;
        let outcome = reconcile::upsert(&mut sheet, user)?;
        store::persist(&self.path, &sheet).inspect_err(|err| {
            error!(path = %self.path.display(), "Failed to write roster: {}", err);
        })?;

        let filled: Vec<&str> = outcome.filled().iter().map(|f| f.column_name()).collect();
        info!(
            user = %user.label(),
            row = outcome.row(),
            inserted = outcome.is_insert(),
            filled = ?filled,
            "Roster updated"
        );
        Ok(outcome)
    }

    /// All users with a non-empty username.
    ///
    /// A roster without a `username` column yields an empty list.
    pub fn read_all(&self) -> Result<Vec<UserRecord>> {
        let sheet = store::open_for_read(&self.path).inspect_err(|err| {
            error!(path = %self.path.display(), "Failed to read roster: {}", err);
        })?;

        match reconcile::read_records(&sheet) {
            Ok(users) => {
                info!(count = users.len(), "Users loaded from roster");
                Ok(users)
            }
            Err(err @ Error::MissingRequiredColumn(_)) => {
                error!(path = %self.path.display(), "{}", err);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}
