//! Persistent asset library of map and token images.
//!
//! Every asset is one image file in its type's directory, one optional
//! thumbnail, and one metadata record. The metadata map is saved after
//! every mutation; a failed save rolls the in-memory state back.

mod cache;
mod config;
mod metadata;
pub mod thumbnail;

pub use cache::ImageCache;
pub use config::{
    DEFAULT_THUMBNAIL_SIZE, LIBRARY_DIR_NAME, LIBRARY_HOME_ENV, LibraryConfig, MAPS_DIR_NAME,
    METADATA_FILE_NAME, THUMBNAILS_DIR_NAME, TOKENS_DIR_NAME,
};
pub use metadata::{AssetMetadata, DEFAULT_CATEGORY, LibraryType, parse_tags};

use crate::storage::{FileStore, MetadataMap, MetadataStore, StorageError};
use image::{DynamicImage, ImageReader};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension given to sources without one.
const FALLBACK_EXTENSION: &str = "png";
/// Stem used when a source name has none.
const FALLBACK_STEM: &str = "image";

/// Library errors.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

impl From<StorageError> for LibraryError {
    fn from(err: StorageError) -> Self {
        LibraryError::Storage(err.to_string())
    }
}

/// Gallery query: one library type, optionally narrowed by category and search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryFilter {
    pub library_type: LibraryType,
    pub category: Option<String>,
    pub query: String,
}

impl GalleryFilter {
    /// Match every asset of one library type.
    pub fn new(library_type: LibraryType) -> Self {
        Self {
            library_type,
            category: None,
            query: String::new(),
        }
    }

    /// Only keep assets in exactly this category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Only keep assets matching this search text.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    fn matches(&self, metadata: &AssetMetadata) -> bool {
        metadata.library_type() == self.library_type
            && self
                .category
                .as_deref()
                .is_none_or(|category| metadata.category() == category)
            && metadata.matches_search(&self.query)
    }
}

/// Outcome of a mass import.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<AssetMetadata>,
    pub failed: Vec<(PathBuf, LibraryError)>,
}

impl ImportReport {
    /// Whether every file was imported.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The asset library.
pub struct AssetLibrary {
    config: LibraryConfig,
    store: Box<dyn MetadataStore>,
    entries: MetadataMap,
    /// Encoded thumbnail PNGs already read or generated this session.
    thumbnails: HashMap<String, Vec<u8>>,
}

impl AssetLibrary {
    /// Open the library at `config.root`, creating its directories.
    ///
    /// A missing metadata file yields an empty library. An unreadable one
    /// is an error so that it is never silently overwritten.
    pub fn open(config: LibraryConfig) -> LibraryResult<Self> {
        let store = FileStore::new(config.metadata_path());
        Self::with_store(config, Box::new(store))
    }

    /// Open the per-user library.
    pub fn open_default() -> LibraryResult<Self> {
        Self::open(LibraryConfig::default_location()?)
    }

    /// Open a library whose metadata lives in `store`.
    pub fn with_store(
        config: LibraryConfig,
        store: Box<dyn MetadataStore>,
    ) -> LibraryResult<Self> {
        for dir in [
            config.asset_dir(LibraryType::Map),
            config.asset_dir(LibraryType::Token),
            config.thumbnails_dir(),
        ] {
            create_dir(&dir)?;
        }

        let entries = match store.load() {
            Ok(entries) => entries,
            Err(StorageError::NotFound(_)) => MetadataMap::new(),
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "Opened asset library at {} ({} assets)",
            config.root().display(),
            entries.len()
        );

        Ok(Self {
            config,
            store,
            entries,
            thumbnails: HashMap::new(),
        })
    }

    /// Location and sizing settings the library was opened with.
    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Store an image under a fresh id derived from `source_name`.
    pub fn add_image(
        &mut self,
        bytes: &[u8],
        source_name: &str,
        library_type: LibraryType,
    ) -> LibraryResult<AssetMetadata> {
        let (stem, extension) = split_source_name(source_name);
        let id = self.unique_id(&stem);
        let file_name = format!("{}.{}", id, extension);

        let dir = self.config.asset_dir(library_type);
        create_dir(&dir)?;
        let path = dir.join(&file_name);
        if let Err(e) = fs::write(&path, bytes) {
            let _ = fs::remove_file(&path);
            return Err(LibraryError::Storage(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )));
        }

        let mut metadata =
            AssetMetadata::new(&id, file_name, library_type, self.config.default_cell_size);
        metadata.display_name = stem;

        let thumbnail = match self.store_thumbnail(&id, bytes) {
            Ok(png) => Some(png),
            Err(e) => {
                log::warn!("No thumbnail for {}: {}", id, e);
                None
            }
        };

        self.entries.insert(id.clone(), metadata.clone());
        if let Err(e) = self.persist() {
            self.entries.remove(&id);
            let _ = fs::remove_file(&path);
            let _ = fs::remove_file(self.config.thumbnail_path(&id));
            return Err(e);
        }

        if let Some(png) = thumbnail {
            self.thumbnails.insert(id.clone(), png);
        }
        log::info!("Added {} '{}' to the library", library_type, id);
        Ok(metadata)
    }

    /// Read a file from disk and add it.
    pub fn add_file(
        &mut self,
        path: &Path,
        library_type: LibraryType,
    ) -> LibraryResult<AssetMetadata> {
        let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.add_image(&bytes, &name, library_type)
    }

    /// Add many files. One failure does not stop the rest.
    pub fn import_files<I, P>(&mut self, paths: I, library_type: LibraryType) -> ImportReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = ImportReport::default();
        for path in paths {
            let path = path.as_ref();
            match self.add_file(path, library_type) {
                Ok(metadata) => report.imported.push(metadata),
                Err(e) => {
                    log::warn!("Failed to import {}: {}", path.display(), e);
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        }
        log::info!(
            "Imported {} of {} {}",
            report.imported.len(),
            report.imported.len() + report.failed.len(),
            library_type
        );
        report
    }

    /// Path of an asset's image file.
    pub fn image_path(&self, id: &str) -> Option<PathBuf> {
        self.entries
            .get(id)
            .map(|m| self.config.asset_dir(m.library_type()).join(m.file_name()))
    }

    /// Raw bytes of an asset's image.
    pub fn load_image(&self, id: &str) -> LibraryResult<Vec<u8>> {
        let path = self
            .image_path(id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        fs::read(&path).map_err(|e| read_error(&path, e))
    }

    /// Load and decode an asset's image.
    pub fn decode_image(&self, id: &str) -> LibraryResult<DynamicImage> {
        let bytes = self.load_image(id)?;
        image::load_from_memory(&bytes)
            .map_err(|e| LibraryError::Decode(format!("Failed to decode {}: {}", id, e)))
    }

    /// Pixel size of an asset's image, read from its header.
    pub fn image_dimensions(&self, id: &str) -> LibraryResult<(u32, u32)> {
        let bytes = self.load_image(id)?;
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| LibraryError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| LibraryError::Decode(format!("Failed to read size of {}: {}", id, e)))
    }

    /// Encoded thumbnail for an asset, or `None` if it has none.
    pub fn thumbnail(&mut self, id: &str) -> Option<&[u8]> {
        if !self.entries.contains_key(id) {
            return None;
        }
        if !self.thumbnails.contains_key(id) {
            let path = self.config.thumbnail_path(id);
            match fs::read(&path) {
                Ok(png) => {
                    self.thumbnails.insert(id.to_string(), png);
                }
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        log::warn!("Failed to read {}: {}", path.display(), e);
                    }
                    return None;
                }
            }
        }
        self.thumbnails.get(id).map(Vec::as_slice)
    }

    /// Rebuild an asset's thumbnail from its current image.
    pub fn regenerate_thumbnail(&mut self, id: &str) -> LibraryResult<()> {
        let bytes = self.load_image(id)?;
        let png = self.store_thumbnail(id, &bytes)?;
        self.thumbnails.insert(id.to_string(), png);
        Ok(())
    }

    /// Overwrite an asset's image, keeping its id and metadata.
    pub fn replace_image(&mut self, id: &str, bytes: &[u8]) -> LibraryResult<()> {
        let path = self
            .image_path(id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        fs::write(&path, bytes).map_err(|e| {
            LibraryError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })?;

        self.thumbnails.remove(id);
        match self.store_thumbnail(id, bytes) {
            Ok(png) => {
                self.thumbnails.insert(id.to_string(), png);
            }
            Err(e) => {
                log::warn!("No thumbnail for replaced {}: {}", id, e);
                let _ = fs::remove_file(self.config.thumbnail_path(id));
            }
        }
        log::info!("Replaced image of '{}'", id);
        Ok(())
    }

    /// Remove an asset with its files. Unknown ids are ignored.
    pub fn delete_image(&mut self, id: &str) -> LibraryResult<()> {
        let Some(metadata) = self.entries.remove(id) else {
            return Ok(());
        };
        if let Err(e) = self.persist() {
            self.entries.insert(id.to_string(), metadata);
            return Err(e);
        }

        let path = self
            .config
            .asset_dir(metadata.library_type())
            .join(metadata.file_name());
        remove_stale(&path);
        remove_stale(&self.config.thumbnail_path(id));
        self.thumbnails.remove(id);

        log::info!("Deleted {} '{}'", metadata.library_type(), id);
        Ok(())
    }

    /// Replace the editable fields of an asset's metadata.
    ///
    /// Id, file name, library type and date added are kept from the stored record.
    pub fn update_metadata(&mut self, id: &str, metadata: AssetMetadata) -> LibraryResult<()> {
        self.mutate(id, move |stored| {
            let mut updated = metadata;
            updated.id = stored.id.clone();
            updated.file_name = stored.file_name.clone();
            updated.library_type = stored.library_type;
            updated.date_added = stored.date_added;
            updated.touch();
            *stored = updated;
        })
    }

    /// Persist the grid square size for an asset. Zero is ignored.
    pub fn set_cell_size(&mut self, id: &str, size: u32) -> LibraryResult<()> {
        if size == 0 {
            return Ok(());
        }
        self.mutate(id, |stored| stored.set_cell_size(size))
    }

    /// Metadata of one asset.
    pub fn metadata(&self, id: &str) -> Option<&AssetMetadata> {
        self.entries.get(id)
    }

    /// Check if an asset id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of assets across both library types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every id, sorted.
    pub fn all_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Ids of one library type, sorted.
    pub fn ids_by_type(&self, library_type: LibraryType) -> Vec<String> {
        self.ids_where(|m| m.library_type() == library_type)
    }

    /// Ids in `category`, optionally limited to one library type.
    pub fn ids_by_category(
        &self,
        category: &str,
        library_type: Option<LibraryType>,
    ) -> Vec<String> {
        self.ids_where(|m| {
            m.category() == category && library_type.is_none_or(|t| m.library_type() == t)
        })
    }

    /// Distinct categories in use.
    pub fn categories(&self, library_type: Option<LibraryType>) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|m| library_type.is_none_or(|t| m.library_type() == t))
            .map(|m| m.category().to_string())
            .collect()
    }

    /// Ids whose name, category, tags or notes contain `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<String> {
        self.ids_where(|m| m.matches_search(query))
    }

    /// Ids matching `filter`, ordered by display name ignoring case.
    pub fn gallery(&self, filter: &GalleryFilter) -> Vec<String> {
        let mut matches: Vec<&AssetMetadata> =
            self.entries.values().filter(|m| filter.matches(m)).collect();
        matches.sort_by_cached_key(|m| (m.display_name().to_lowercase(), m.id().to_string()));
        matches.into_iter().map(|m| m.id().to_string()).collect()
    }

    fn ids_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&AssetMetadata) -> bool,
    {
        self.entries
            .values()
            .filter(|m| predicate(m))
            .map(|m| m.id().to_string())
            .collect()
    }

    fn unique_id(&self, stem: &str) -> String {
        if !self.entries.contains_key(stem) {
            return stem.to_string();
        }
        (1u64..)
            .map(|n| format!("{}_{}", stem, n))
            .find(|candidate| !self.entries.contains_key(candidate))
            .unwrap_or_else(|| stem.to_string())
    }

    /// Generate a thumbnail and write it to disk.
    fn store_thumbnail(&self, id: &str, bytes: &[u8]) -> LibraryResult<Vec<u8>> {
        let png = thumbnail::generate(bytes, self.config.thumbnail_size)?;
        create_dir(&self.config.thumbnails_dir())?;
        let path = self.config.thumbnail_path(id);
        fs::write(&path, &png).map_err(|e| {
            LibraryError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(png)
    }

    fn mutate<F>(&mut self, id: &str, change: F) -> LibraryResult<()>
    where
        F: FnOnce(&mut AssetMetadata),
    {
        let stored = self
            .entries
            .get_mut(id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        let previous = stored.clone();
        change(stored);

        if let Err(e) = self.persist() {
            self.entries.insert(id.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> LibraryResult<()> {
        self.store.save(&self.entries).map_err(|e| {
            log::error!("Failed to save library metadata: {}", e);
            LibraryError::from(e)
        })
    }
}

/// Split a source file name into id stem and stored extension.
///
/// The stem is everything before the last dot, unless the name starts with
/// its only dot. Sources without an extension are stored as png.
fn split_source_name(source_name: &str) -> (String, String) {
    let name = Path::new(source_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot + 1..]),
        _ => (name.as_str(), ""),
    };
    let stem = stem.trim();
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
    let extension = if extension.is_empty() {
        FALLBACK_EXTENSION
    } else {
        extension
    };
    (stem.to_string(), extension.to_string())
}

fn create_dir(dir: &Path) -> LibraryResult<()> {
    fs::create_dir_all(dir)
        .map_err(|e| LibraryError::Storage(format!("Failed to create {}: {}", dir.display(), e)))
}

fn read_error(path: &Path, err: io::Error) -> LibraryError {
    if err.kind() == io::ErrorKind::NotFound {
        LibraryError::NotFound(path.display().to_string())
    } else {
        LibraryError::Storage(format!("Failed to read {}: {}", path.display(), err))
    }
}

fn remove_stale(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
