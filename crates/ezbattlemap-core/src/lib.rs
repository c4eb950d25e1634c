//! EzBattleMap Core Library
//!
//! Scene model for a two-screen battle map: grid reveal state, tokens, the
//! audience mirror, and the persistent asset library.

pub mod camera;
pub mod grid;
pub mod interaction;
pub mod library;
pub mod scene;
pub mod storage;
pub mod tokens;

pub use camera::Camera;
pub use grid::{CellCoord, DEFAULT_CELL_SIZE, Grid, PixelRect};
pub use interaction::{RevealStroke, TokenDrag};
pub use library::{
    AssetLibrary, AssetMetadata, GalleryFilter, ImageCache, ImportReport, LibraryConfig,
    LibraryError, LibraryResult, LibraryType,
};
pub use scene::{AudienceFrame, EditMode, Scene, TokenSprite};
pub use storage::{FileStore, MemoryStore, MetadataStore, StorageError};
pub use tokens::{TOKEN_SIZES, Token, TokenId, TokenLayer};
