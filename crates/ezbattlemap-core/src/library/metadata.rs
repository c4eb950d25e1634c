//! Editable metadata stored for every library asset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Category given to newly imported assets.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Which half of the library an asset belongs to.
///
/// Splits storage directories and gallery filtering. Ids are unique across
/// both halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    /// Background map images.
    Map,
    /// Creature token artwork.
    Token,
}

impl LibraryType {
    /// Display name for this library half.
    pub fn name(self) -> &'static str {
        match self {
            LibraryType::Map => "Maps",
            LibraryType::Token => "Tokens",
        }
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LibraryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "map" | "maps" => Ok(LibraryType::Map),
            "token" | "tokens" => Ok(LibraryType::Token),
            other => Err(format!("Unknown library type '{}' (expected maps or tokens)", other)),
        }
    }
}

/// Metadata for one stored image.
///
/// Setters refresh `last_modified`; replacing the image bytes does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub(crate) id: String,
    pub(crate) display_name: String,
    pub(crate) category: String,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) notes: String,
    /// File name inside the type's asset directory.
    pub(crate) file_name: String,
    pub(crate) library_type: LibraryType,
    /// Grid square size used when this image is shown as a map.
    pub(crate) cell_size: u32,
    pub(crate) date_added: DateTime<Utc>,
    pub(crate) last_modified: DateTime<Utc>,
}

impl AssetMetadata {
    /// Create metadata with default name, category and empty tags.
    pub fn new(
        id: impl Into<String>,
        file_name: impl Into<String>,
        library_type: LibraryType,
        cell_size: u32,
    ) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            display_name: id.clone(),
            id,
            category: DEFAULT_CATEGORY.to_string(),
            tags: BTreeSet::new(),
            notes: String::new(),
            file_name: file_name.into(),
            library_type,
            cell_size,
            date_added: now,
            last_modified: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Tags, always lowercase and trimmed.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn library_type(&self) -> LibraryType {
        self.library_type
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
        self.touch();
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        self.touch();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.touch();
    }

    /// Set the grid square size. Zero is ignored.
    pub fn set_cell_size(&mut self, size: u32) {
        if size == 0 {
            return;
        }
        self.cell_size = size;
        self.touch();
    }

    pub fn add_tag(&mut self, tag: &str) {
        let tag = normalize_tag(tag);
        if !tag.is_empty() {
            self.tags.insert(tag);
        }
        self.touch();
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.remove(&normalize_tag(tag));
        self.touch();
    }

    /// Replace all tags. Blank tags are dropped.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| normalize_tag(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        self.touch();
    }

    /// Case-insensitive substring match against name, category, tags and notes.
    ///
    /// Surrounding whitespace in the query is ignored; a blank query matches
    /// everything.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.display_name.to_lowercase().contains(&query)
            || self.category.to_lowercase().contains(&query)
            || self.tags.iter().any(|tag| tag.contains(&query))
            || self.notes.to_lowercase().contains(&query)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Split a comma separated tag list as typed in the edit dialog.
pub fn parse_tags(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(normalize_tag)
        .filter(|t| !t.is_empty())
        .collect()
}
