//! Manual roster upsert

use std::path::Path;

use crate::error::Result;
use crate::lock::RosterLock;
use crate::roster::{Roster, UpsertOutcome};
use crate::user::UserRecord;

/// Upsert one record while holding the roster lock.
pub fn run(roster_path: &Path, record: &UserRecord) -> Result<UpsertOutcome> {
    let _lock = RosterLock::acquire(roster_path)?;
    let outcome = Roster::new(roster_path).upsert(record)?;

    let filled: Vec<&str> = outcome.filled().iter().map(|f| f.column_name()).collect();
    if outcome.is_insert() {
        println!("✅ Added {} (row {})", record.label(), outcome.row());
    } else if filled.is_empty() {
        println!("ℹ️  {} already up to date (row {})", record.label(), outcome.row());
    } else {
        println!(
            "✅ Updated {} (row {}): filled {}",
            record.label(),
            outcome.row(),
            filled.join(", ")
        );
    }
    Ok(outcome)
}
