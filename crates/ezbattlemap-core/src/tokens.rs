//! Creature tokens layered over the map grid.
//!
//! Tokens are kept in insertion order, which doubles as z-order: the last
//! placed token is painted last and wins hit tests.

use crate::grid::CellCoord;
use image::DynamicImage;
use kurbo::Rect;
use std::fmt;
use std::sync::Arc;

/// Token footprints offered by the size menu, in grid squares per side.
pub const TOKEN_SIZES: [u32; 3] = [1, 2, 3];

/// Identifier of a placed token.
///
/// Allocated from a per-layer counter and never reused by that layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u64);

impl TokenId {
    /// Numeric value of the id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token_{}", self.0)
    }
}

/// A marker placed on the grid that shows a library asset.
#[derive(Debug, Clone)]
pub struct Token {
    id: TokenId,
    asset_id: String,
    grid_x: i32,
    grid_y: i32,
    width: u32,
    height: u32,
    /// Decoded artwork, filled lazily by [`Token::resolve_image`].
    cached_image: Option<Arc<DynamicImage>>,
}

impl Token {
    fn new(id: TokenId, asset_id: String, grid_x: i32, grid_y: i32) -> Self {
        Self {
            id,
            asset_id,
            grid_x,
            grid_y,
            width: 1,
            height: 1,
            cached_image: None,
        }
    }

    /// Layer-assigned id.
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Library asset this token displays.
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn grid_x(&self) -> i32 {
        self.grid_x
    }

    pub fn grid_y(&self) -> i32 {
        self.grid_y
    }

    /// Top-left cell of the footprint.
    pub fn position(&self) -> CellCoord {
        CellCoord::new(self.grid_x, self.grid_y)
    }

    /// Footprint width in grid squares.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Footprint height in grid squares.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check if the footprint covers the given cell.
    pub fn overlaps_cell(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        let left = self.grid_x as i64;
        let top = self.grid_y as i64;
        x >= left && x < left + self.width as i64 && y >= top && y < top + self.height as i64
    }

    /// Footprint in image pixels for the given cell size.
    ///
    /// Not clipped: tokens may sit partly or wholly outside the image.
    pub fn pixel_rect(&self, cell_size: u32) -> Rect {
        let size = cell_size as f64;
        let x0 = self.grid_x as f64 * size;
        let y0 = self.grid_y as f64 * size;
        Rect::new(
            x0,
            y0,
            x0 + self.width as f64 * size,
            y0 + self.height as f64 * size,
        )
    }

    /// The cached artwork, if it has been resolved.
    pub fn cached_image(&self) -> Option<&Arc<DynamicImage>> {
        self.cached_image.as_ref()
    }

    /// Seed the cache, e.g. with the image already decoded for a drag preview.
    pub fn set_cached_image(&mut self, image: Arc<DynamicImage>) {
        self.cached_image = Some(image);
    }

    /// Drop the cached artwork so the next resolve reloads it.
    pub fn clear_cached_image(&mut self) {
        self.cached_image = None;
    }

    /// Return the cached artwork, loading it through `load` on first use.
    ///
    /// A failed load leaves the cache empty so the next call retries.
    pub fn resolve_image<F>(&mut self, load: F) -> Option<Arc<DynamicImage>>
    where
        F: FnOnce(&str) -> Option<Arc<DynamicImage>>,
    {
        if self.cached_image.is_none() {
            self.cached_image = load(&self.asset_id);
        }
        self.cached_image.clone()
    }
}

/// Insertion-ordered collection of tokens on the current map.
///
/// Every operation addressing an unknown id is a no-op: a token deleted
/// while being dragged must not interrupt the interaction.
#[derive(Debug, Clone)]
pub struct TokenLayer {
    /// Tokens from bottom to top.
    tokens: Vec<Token>,
    next_id: u64,
}

impl Default for TokenLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenLayer {
    /// Create an empty layer whose first token id is `token_1`.
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            next_id: 1,
        }
    }

    /// Place a new 1x1 token on top of all others.
    pub fn place(&mut self, asset_id: impl Into<String>, grid_x: i32, grid_y: i32) -> &mut Token {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        let token = Token::new(id, asset_id.into(), grid_x, grid_y);
        log::debug!("Placed {} ({}) at ({}, {})", id, token.asset_id, grid_x, grid_y);
        self.tokens.push(token);
        let last = self.tokens.len() - 1;
        &mut self.tokens[last]
    }

    /// Remove a token, returning it if it existed.
    pub fn remove(&mut self, id: TokenId) -> Option<Token> {
        let pos = self.tokens.iter().position(|t| t.id == id)?;
        log::debug!("Removed {}", id);
        Some(self.tokens.remove(pos))
    }

    /// Look up a token by id.
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    /// Look up a token by id for in-place edits.
    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.iter_mut().find(|t| t.id == id)
    }

    /// Move a token's top-left cell. No bounds checking against the grid.
    /// Returns false if the token does not exist.
    pub fn move_to(&mut self, id: TokenId, grid_x: i32, grid_y: i32) -> bool {
        match self.get_mut(id) {
            Some(token) => {
                token.grid_x = grid_x;
                token.grid_y = grid_y;
                true
            }
            None => false,
        }
    }

    /// Change a token's footprint. Zero dimensions are rejected.
    /// Returns false for an unknown id or an invalid size.
    pub fn resize(&mut self, id: TokenId, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        match self.get_mut(id) {
            Some(token) => {
                token.width = width;
                token.height = height;
                true
            }
            None => false,
        }
    }

    /// Topmost token whose footprint covers the cell.
    pub fn token_at(&self, grid_x: i32, grid_y: i32) -> Option<&Token> {
        self.tokens
            .iter()
            .rev()
            .find(|t| t.overlaps_cell(grid_x, grid_y))
    }

    /// All tokens from bottom to top, which is also paint order.
    pub fn all(&self) -> &[Token] {
        &self.tokens
    }

    /// Iterate tokens from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Drop cached artwork of every token showing `asset_id`.
    pub fn invalidate_asset(&mut self, asset_id: &str) {
        for token in self.tokens.iter_mut().filter(|t| t.asset_id == asset_id) {
            token.clear_cached_image();
        }
    }

    /// Remove every token. Ids keep counting up.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Number of placed tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn ids(layer: &TokenLayer) -> Vec<TokenId> {
        layer.all().iter().map(Token::id).collect()
    }

    #[test]
    fn test_place_defaults() {
        let mut layer = TokenLayer::new();
        let token = layer.place("goblin", 3, 4);
        assert_eq!(token.asset_id(), "goblin");
        assert_eq!(token.position(), CellCoord::new(3, 4));
        assert_eq!((token.width(), token.height()), (1, 1));
        assert!(token.cached_image().is_none());
        assert_eq!(token.id().to_string(), "token_1");
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut layer = TokenLayer::new();
        let a = layer.place("a", 0, 0).id();
        let b = layer.place("b", 0, 0).id();
        layer.remove(b);
        layer.clear();
        let c = layer.place("c", 0, 0).id();
        assert_ne!(a, c);
        assert_ne!(b, c);
        assert_eq!(c.get(), 3);
    }

    #[test]
    fn test_topmost_token_wins() {
        let mut layer = TokenLayer::new();
        let _first = layer.place("a", 2, 2).id();
        let second = layer.place("b", 2, 2).id();
        let third = layer.place("c", 2, 2).id();

        assert_eq!(layer.token_at(2, 2).map(Token::id), Some(third));
        layer.remove(third);
        assert_eq!(layer.token_at(2, 2).map(Token::id), Some(second));
    }

    #[test]
    fn test_hit_test_uses_footprint() {
        let mut layer = TokenLayer::new();
        let big = layer.place("ogre", 1, 1).id();
        layer.resize(big, 3, 2);

        assert_eq!(layer.token_at(3, 2).map(Token::id), Some(big));
        assert!(layer.token_at(4, 2).is_none());
        assert!(layer.token_at(1, 3).is_none());
        assert!(layer.token_at(0, 1).is_none());

        let small = layer.place("rat", 2, 2).id();
        assert_eq!(layer.token_at(2, 2).map(Token::id), Some(small));
        assert_eq!(layer.token_at(1, 1).map(Token::id), Some(big));
    }

    #[test]
    fn test_paint_order_is_insertion_order() {
        let mut layer = TokenLayer::new();
        let a = layer.place("a", 0, 0).id();
        let b = layer.place("b", 5, 5).id();
        let c = layer.place("c", 1, 1).id();
        assert_eq!(ids(&layer), vec![a, b, c]);

        layer.move_to(a, 9, 9);
        assert_eq!(ids(&layer), vec![a, b, c]);
    }

    #[test]
    fn test_move_allows_out_of_grid_positions() {
        let mut layer = TokenLayer::new();
        let id = layer.place("a", 0, 0).id();
        assert!(layer.move_to(id, -4, 250));
        let token = layer.get(id).unwrap();
        assert_eq!((token.grid_x(), token.grid_y()), (-4, 250));
        assert_eq!(layer.token_at(-4, 250).map(Token::id), Some(id));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut layer = TokenLayer::new();
        let id = layer.place("a", 0, 0).id();
        layer.remove(id);

        assert!(!layer.move_to(id, 1, 1));
        assert!(!layer.resize(id, 2, 2));
        assert!(layer.remove(id).is_none());
        assert!(layer.get(id).is_none());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_resize_rejects_zero() {
        let mut layer = TokenLayer::new();
        let id = layer.place("a", 0, 0).id();
        assert!(!layer.resize(id, 0, 2));
        assert!(layer.resize(id, 7, 2));
        let token = layer.get(id).unwrap();
        assert_eq!((token.width(), token.height()), (7, 2));
    }

    #[test]
    fn test_pixel_rect() {
        let mut layer = TokenLayer::new();
        let id = layer.place("a", -1, 2).id();
        layer.resize(id, 2, 1);
        let rect = layer.get(id).unwrap().pixel_rect(50);
        assert_eq!(rect, Rect::new(-50.0, 100.0, 50.0, 150.0));
    }

    #[test]
    fn test_resolve_image_caches_success_only() {
        let mut layer = TokenLayer::new();
        let id = layer.place("dragon", 0, 0).id();
        let token = layer.get_mut(id).unwrap();

        assert!(token.resolve_image(|_| None).is_none());
        assert!(token.cached_image().is_none());

        let image = Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(2, 2)));
        let mut loads = 0;
        let resolved = token.resolve_image(|asset| {
            assert_eq!(asset, "dragon");
            loads += 1;
            Some(image.clone())
        });
        assert!(resolved.is_some());
        assert!(token.resolve_image(|_| panic!("already cached")).is_some());
        assert_eq!(loads, 1);
    }

    #[test]
    fn test_invalidate_asset() {
        let mut layer = TokenLayer::new();
        let image = Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(1, 1)));
        let a = layer.place("dragon", 0, 0).id();
        let b = layer.place("goblin", 1, 0).id();
        layer.get_mut(a).unwrap().set_cached_image(image.clone());
        layer.get_mut(b).unwrap().set_cached_image(image);

        layer.invalidate_asset("dragon");
        assert!(layer.get(a).unwrap().cached_image().is_none());
        assert!(layer.get(b).unwrap().cached_image().is_some());
    }
}
