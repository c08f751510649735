// src/engine/model.rs
//! Decrypted database content
//!
//! Serialized as JSON inside the encrypted body. Entry fields are wiped
//! when the content is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::consts::{BACKUP_GROUP_TITLE, DEFAULT_GROUP_TITLE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("group \"{0}\" already exists")]
pub struct DuplicateGroup(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseContent {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub title: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Entry {
    pub title: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    #[zeroize(skip)]
    pub modified: DateTime<Utc>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("modified", &self.modified)
            .finish()
    }
}

impl DatabaseContent {
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
            groups: Vec::new(),
        }
    }

    /// Layout every new database starts with: a general group and a backup group
    pub fn with_default_groups() -> Result<Self, DuplicateGroup> {
        let mut content = Self::empty();
        content.add_group(DEFAULT_GROUP_TITLE)?;
        content.add_group(BACKUP_GROUP_TITLE)?;
        Ok(content)
    }

    pub fn add_group(&mut self, title: &str) -> Result<&mut Group, DuplicateGroup> {
        if self.group(title).is_some() {
            return Err(DuplicateGroup(title.to_string()));
        }
        self.groups.push(Group {
            title: title.to_string(),
            created: Utc::now(),
            entries: Vec::new(),
        });
        let index = self.groups.len() - 1;
        Ok(&mut self.groups[index])
    }

    pub fn group(&self, title: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.title == title)
    }

    pub fn backup_group(&self) -> Option<&Group> {
        self.group(BACKUP_GROUP_TITLE)
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_databases_get_general_and_backup_groups() {
        let content = DatabaseContent::with_default_groups().unwrap();
        let titles: Vec<_> = content.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, ["General", "Backup"]);
        assert!(content.backup_group().is_some());
        assert_eq!(content.entry_count(), 0);
    }

    #[test]
    fn duplicate_group_titles_are_rejected() {
        let mut content = DatabaseContent::with_default_groups().unwrap();
        assert_eq!(
            content.add_group("Backup").unwrap_err(),
            DuplicateGroup("Backup".into())
        );
    }

    #[test]
    fn entry_debug_hides_password() {
        let entry = Entry {
            title: "mail".into(),
            username: "me".into(),
            password: "hunter2".into(),
            url: String::new(),
            notes: String::new(),
            modified: Utc::now(),
        };
        assert!(!format!("{entry:?}").contains("hunter2"));
    }
}
