//! List roster users

use std::path::Path;

use crate::error::Result;
use crate::roster::Roster;
use crate::user::UserRecord;

/// Output format for `list`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

fn cell(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

/// Render users as a fixed-width table or pretty JSON.
pub fn render(users: &[UserRecord], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(users)?);
    }

    let mut out = format!(
        "{:<4} {:<24} {:<10} {:<24} {:>14}\n",
        "#", "USERNAME", "GENDER", "LASTNAME", "CHAT_ID"
    );
    for (idx, user) in users.iter().enumerate() {
        let chat_id = user
            .numeric_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<4} {:<24} {:<10} {:<24} {:>14}\n",
            idx + 1,
            cell(user.handle.as_deref()),
            cell(user.display_gender.as_deref()),
            cell(user.display_name.as_deref()),
            chat_id
        ));
    }
    out.push_str(&format!("\n{} user(s)", users.len()));
    Ok(out)
}

pub fn run(roster_path: &Path, format: OutputFormat) -> Result<Vec<UserRecord>> {
    let users = Roster::new(roster_path).read_all()?;
    println!("{}", render(&users, format)?);
    Ok(users)
}
