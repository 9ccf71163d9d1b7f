//! Filtering and ordering of the shared note catalog.

use crate::models::{Branch, Note, Semester};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    Newest,
    Popular,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Newest => f.write_str("newest"),
            SortMode::Popular => f.write_str("popular"),
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(SortMode::Newest),
            "popular" => Ok(SortMode::Popular),
            other => Err(format!("Unknown sort mode '{}'. Use 'newest' or 'popular'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub query: String,
    pub branch: Option<Branch>,
    pub semester: Option<Semester>,
    pub sort: SortMode,
}

impl CatalogQuery {
    /// Derives the visible catalog. The input slice is left untouched.
    pub fn apply(&self, notes: &[Note]) -> Vec<Note> {
        let needle = self.query.to_lowercase();

        let mut result: Vec<Note> = notes
            .iter()
            .filter(|n| needle.is_empty() || matches_text(n, &needle))
            .filter(|n| self.branch.map_or(true, |b| n.branch == b))
            .filter(|n| self.semester.map_or(true, |s| n.semester == s))
            .cloned()
            .collect();

        // sort_by is stable, ties keep collection order
        match self.sort {
            SortMode::Newest => result.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortMode::Popular => result.sort_by(|a, b| b.download_count.cmp(&a.download_count)),
        }

        result
    }
}

fn matches_text(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle)
        || note.subject.to_lowercase().contains(needle)
        || note.description.to_lowercase().contains(needle)
}

/// Notes uploaded by one user, in collection order.
pub fn owned_by(notes: &[Note], user_id: &str) -> Vec<Note> {
    notes
        .iter()
        .filter(|n| n.uploader_id == user_id)
        .cloned()
        .collect()
}

pub fn total_downloads(notes: &[Note]) -> u64 {
    notes.iter().map(|n| n.download_count).sum()
}
