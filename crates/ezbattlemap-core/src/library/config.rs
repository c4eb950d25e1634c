//! Library location and sizing defaults.

use super::{LibraryError, LibraryResult};
use crate::grid::DEFAULT_CELL_SIZE;
use crate::library::LibraryType;
use std::path::{Path, PathBuf};

/// Environment variable overriding the library root.
pub const LIBRARY_HOME_ENV: &str = "EZBATTLEMAP_HOME";
/// Library directory created under the user's home.
pub const LIBRARY_DIR_NAME: &str = ".ezbattlemap";
pub const MAPS_DIR_NAME: &str = "maps";
pub const TOKENS_DIR_NAME: &str = "tokens";
pub const THUMBNAILS_DIR_NAME: &str = "thumbnails";
/// Metadata file holding every asset record.
pub const METADATA_FILE_NAME: &str = "library.json";
/// Edge length of the square thumbnail canvas in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 150;

/// Where the library lives and how new assets are set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Root directory holding the asset, thumbnail and metadata stores.
    pub root: PathBuf,
    /// Grid square size given to newly imported assets.
    pub default_cell_size: u32,
    /// Side of the generated thumbnails.
    pub thumbnail_size: u32,
}

impl LibraryConfig {
    /// Config rooted at `root` with default sizes.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_cell_size: DEFAULT_CELL_SIZE,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }

    /// Config for the per-user library.
    ///
    /// Uses `$EZBATTLEMAP_HOME` if set, otherwise `~/.ezbattlemap`.
    pub fn default_location() -> LibraryResult<Self> {
        if let Some(dir) = std::env::var_os(LIBRARY_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(dir)));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            LibraryError::Storage("Could not determine home directory".to_string())
        })?;
        Ok(Self::new(home.join(LIBRARY_DIR_NAME)))
    }

    pub fn with_default_cell_size(mut self, size: u32) -> Self {
        if size > 0 {
            self.default_cell_size = size;
        }
        self
    }

    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        if size > 0 {
            self.thumbnail_size = size;
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding assets of one library type.
    pub fn asset_dir(&self, library_type: LibraryType) -> PathBuf {
        match library_type {
            LibraryType::Map => self.root.join(MAPS_DIR_NAME),
            LibraryType::Token => self.root.join(TOKENS_DIR_NAME),
        }
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(THUMBNAILS_DIR_NAME)
    }

    /// Thumbnail file for an asset id.
    pub fn thumbnail_path(&self, id: &str) -> PathBuf {
        self.thumbnails_dir().join(format!("{}.png", id))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let config = LibraryConfig::new("/data/lib");
        assert_eq!(config.asset_dir(LibraryType::Map), Path::new("/data/lib/maps"));
        assert_eq!(config.asset_dir(LibraryType::Token), Path::new("/data/lib/tokens"));
        assert_eq!(config.thumbnail_path("orc"), Path::new("/data/lib/thumbnails/orc.png"));
        assert_eq!(config.metadata_path(), Path::new("/data/lib/library.json"));
    }

    #[test]
    fn test_builders_ignore_zero() {
        let config = LibraryConfig::new("x")
            .with_default_cell_size(0)
            .with_thumbnail_size(0);
        assert_eq!(config.default_cell_size, DEFAULT_CELL_SIZE);
        assert_eq!(config.thumbnail_size, DEFAULT_THUMBNAIL_SIZE);

        let config = config.with_default_cell_size(64).with_thumbnail_size(96);
        assert_eq!(config.default_cell_size, 64);
        assert_eq!(config.thumbnail_size, 96);
    }
}
