//! Controller-side scene state and the read-only frame mirrored to the audience.

use crate::grid::{CellCoord, Grid, PixelRect};
use crate::interaction::{RevealStroke, TokenDrag};
use crate::tokens::{Token, TokenId, TokenLayer};
use image::DynamicImage;
use kurbo::{Point, Rect, Vec2};
use std::sync::Arc;

/// What pointer input on the map edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Paint fog-of-war reveal state.
    #[default]
    Map,
    /// Select and drag tokens. The grid is never modified in this mode.
    Token,
}

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Reveal(RevealStroke),
    Drag(TokenDrag),
}

/// A token as the audience display should draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSprite {
    pub token: TokenId,
    pub asset_id: String,
    /// Footprint relative to the viewport origin, in image pixels. Not clipped.
    pub rect: Rect,
}

/// Snapshot of everything the audience display needs for one repaint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudienceFrame {
    /// Library id of the map being shown.
    pub map_id: Option<String>,
    pub cell_size: u32,
    /// Crop region of the map image. `None` while nothing is revealed.
    pub viewport: Option<PixelRect>,
    /// Opaque fog rectangles, clipped to the viewport and relative to its origin.
    pub masks: Vec<Rect>,
    /// Tokens touching the viewport, bottom to top.
    pub tokens: Vec<TokenSprite>,
}

impl AudienceFrame {
    /// Build a frame from the current grid and token state.
    pub fn capture(grid: &Grid, tokens: &TokenLayer, map_id: Option<&str>) -> Self {
        let mut frame = Self {
            map_id: map_id.map(str::to_owned),
            cell_size: grid.cell_size(),
            ..Self::default()
        };

        let Some(viewport) = grid.compute_viewport() else {
            return frame;
        };
        let bounds = viewport.to_rect();
        let origin = Vec2::new(bounds.x0, bounds.y0);

        frame.masks = grid
            .unrevealed_cell_rectangles()
            .iter()
            .map(|cell| cell.to_rect().intersect(bounds))
            .filter(|clipped| clipped.area() > 0.0)
            .map(|clipped| clipped - origin)
            .collect();

        frame.tokens = tokens
            .iter()
            .filter_map(|token| {
                let rect = token.pixel_rect(grid.cell_size());
                (rect.intersect(bounds).area() > 0.0).then(|| TokenSprite {
                    token: token.id(),
                    asset_id: token.asset_id().to_owned(),
                    rect: rect - origin,
                })
            })
            .collect();

        frame.viewport = Some(viewport);
        frame
    }

    /// Whether the audience should see the "nothing revealed" placeholder.
    pub fn is_blank(&self) -> bool {
        self.viewport.is_none()
    }

    /// Cut the viewport out of the full map image.
    pub fn crop(&self, image: &DynamicImage) -> Option<DynamicImage> {
        let viewport = self.viewport?;
        let width = viewport.width.min(image.width().saturating_sub(viewport.x));
        let height = viewport.height.min(image.height().saturating_sub(viewport.y));
        if width == 0 || height == 0 {
            return None;
        }
        Some(image.crop_imm(viewport.x, viewport.y, width, height))
    }
}

/// The game master's scene: grid, tokens, active map and the gesture in flight.
///
/// Every mutation marks the scene changed; [`Scene::take_audience_frame`]
/// hands the audience display one fresh frame per batch of changes.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    grid: Grid,
    tokens: TokenLayer,
    map_id: Option<String>,
    mode: EditMode,
    gesture: Option<Gesture>,
    selected_token: Option<TokenId>,
    changed: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tokens(&self) -> &TokenLayer {
        &self.tokens
    }

    pub fn map_id(&self) -> Option<&str> {
        self.map_id.as_deref()
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Token picked by the last token-mode press, kept after release.
    pub fn selected_token(&self) -> Option<TokenId> {
        self.selected_token
    }

    /// Show a new map image. Reveal state is reset; tokens stay where they are.
    pub fn load_map(&mut self, map_id: Option<String>, width: u32, height: u32, cell_size: u32) {
        log::debug!("Loading map {:?} ({}x{}, {}px cells)", map_id, width, height, cell_size);
        self.gesture = None;
        self.map_id = map_id;
        self.grid.set_cell_size(cell_size);
        self.grid.set_image_dimensions(width, height);
        self.changed = true;
    }

    /// Change the grid square size. Clears the reveal state if the size changes.
    pub fn set_cell_size(&mut self, size: u32) {
        if size == 0 || size == self.grid.cell_size() {
            return;
        }
        self.gesture = None;
        self.grid.set_cell_size(size);
        self.changed = true;
    }

    /// Switch edit mode, abandoning any gesture in progress.
    pub fn set_mode(&mut self, mode: EditMode) {
        self.mode = mode;
        self.gesture = None;
        if mode == EditMode::Map {
            self.selected_token = None;
        }
    }

    /// Set one cell's reveal state directly.
    pub fn set_cell(&mut self, cell: CellCoord, revealed: bool) {
        if self.grid.contains(cell) && self.grid.is_revealed(cell.x, cell.y) != revealed {
            self.grid.set_cell(cell.x, cell.y, revealed);
            self.changed = true;
        }
    }

    /// Hide every cell.
    pub fn clear_selection(&mut self) {
        if self.grid.has_selection() {
            self.grid.clear();
            self.changed = true;
        }
    }

    /// Press at an image-space point.
    pub fn pointer_down(&mut self, point: Point) {
        self.gesture = None;
        let Some(cell) = self.grid.cell_at(point) else {
            return;
        };
        match self.mode {
            EditMode::Map => {
                if let Some(stroke) = RevealStroke::begin(&mut self.grid, cell) {
                    self.gesture = Some(Gesture::Reveal(stroke));
                    self.changed = true;
                }
            }
            EditMode::Token => {
                let drag = TokenDrag::begin(&self.tokens, &self.grid, cell);
                self.selected_token = drag.map(|d| d.token());
                self.gesture = drag.map(Gesture::Drag);
            }
        }
    }

    /// Drag to an image-space point.
    pub fn pointer_drag(&mut self, point: Point) {
        let Some(cell) = self.grid.cell_at(point) else {
            return;
        };
        let moved = match &mut self.gesture {
            Some(Gesture::Reveal(stroke)) => stroke.extend(&mut self.grid, cell),
            Some(Gesture::Drag(drag)) => drag.extend(&mut self.tokens, &self.grid, cell),
            None => false,
        };
        self.changed |= moved;
    }

    /// Release the pointer.
    pub fn pointer_up(&mut self) {
        self.gesture = None;
    }

    /// Drop a library asset onto a cell as a new topmost token.
    pub fn place_token(&mut self, asset_id: impl Into<String>, cell: CellCoord) -> TokenId {
        self.changed = true;
        self.tokens.place(asset_id, cell.x, cell.y).id()
    }

    /// Like [`Scene::place_token`], seeding the token's image cache.
    pub fn place_token_with_image(
        &mut self,
        asset_id: impl Into<String>,
        cell: CellCoord,
        image: Arc<DynamicImage>,
    ) -> TokenId {
        self.changed = true;
        let token = self.tokens.place(asset_id, cell.x, cell.y);
        token.set_cached_image(image);
        token.id()
    }

    pub fn move_token(&mut self, id: TokenId, cell: CellCoord) {
        self.changed |= self.tokens.move_to(id, cell.x, cell.y);
    }

    pub fn resize_token(&mut self, id: TokenId, width: u32, height: u32) {
        self.changed |= self.tokens.resize(id, width, height);
    }

    pub fn remove_token(&mut self, id: TokenId) -> Option<Token> {
        if self.selected_token == Some(id) {
            self.selected_token = None;
        }
        let removed = self.tokens.remove(id);
        self.changed |= removed.is_some();
        removed
    }

    /// Remove every token from the map.
    pub fn clear_tokens(&mut self) {
        if !self.tokens.is_empty() {
            self.tokens.clear();
            self.changed = true;
        }
        self.selected_token = None;
    }

    /// Resolve a token's artwork through its per-token cache.
    pub fn token_image<F>(&mut self, id: TokenId, load: F) -> Option<Arc<DynamicImage>>
    where
        F: FnOnce(&str) -> Option<Arc<DynamicImage>>,
    {
        self.tokens.get_mut(id)?.resolve_image(load)
    }

    /// Forget cached artwork after a library asset was replaced.
    pub fn invalidate_asset(&mut self, asset_id: &str) {
        self.tokens.invalidate_asset(asset_id);
        self.changed = true;
    }

    /// Whether there are changes the audience has not seen yet.
    pub fn has_changes(&self) -> bool {
        self.changed
    }

    /// Current audience frame, computed on demand.
    pub fn audience_frame(&self) -> AudienceFrame {
        AudienceFrame::capture(&self.grid, &self.tokens, self.map_id.as_deref())
    }

    /// A new audience frame if anything changed since the last call.
    pub fn take_audience_frame(&mut self) -> Option<AudienceFrame> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        let frame = self.audience_frame();
        log::debug!(
            "Publishing audience frame: viewport {:?}, {} masks, {} tokens",
            frame.viewport,
            frame.masks.len(),
            frame.tokens.len()
        );
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn scene_500() -> Scene {
        let mut scene = Scene::new();
        scene.load_map(Some("cave".to_string()), 500, 500, 100);
        scene
    }

    fn center(x: i32, y: i32) -> Point {
        Point::new(x as f64 * 100.0 + 50.0, y as f64 * 100.0 + 50.0)
    }

    #[test]
    fn test_blank_frame_without_reveal() {
        let mut scene = scene_500();
        scene.place_token("goblin", CellCoord::new(1, 1));
        let frame = scene.take_audience_frame().unwrap();
        assert!(frame.is_blank());
        assert!(frame.masks.is_empty());
        assert!(frame.tokens.is_empty());
        assert_eq!(frame.map_id.as_deref(), Some("cave"));
    }

    #[test]
    fn test_frame_masks_are_viewport_relative() {
        let mut scene = scene_500();
        scene.set_cell(CellCoord::new(1, 1), true);
        scene.set_cell(CellCoord::new(3, 2), true);

        let frame = scene.audience_frame();
        assert_eq!(frame.viewport, Some(PixelRect::new(100, 100, 300, 200)));
        // 3x2 cells in the box, two revealed.
        assert_eq!(frame.masks.len(), 4);
        assert!(frame.masks.contains(&Rect::new(100.0, 0.0, 200.0, 100.0)));
        assert!(frame.masks.contains(&Rect::new(0.0, 100.0, 100.0, 200.0)));
        assert!(!frame.masks.contains(&Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn test_frame_tokens_filtered_by_viewport() {
        let mut scene = scene_500();
        scene.set_cell(CellCoord::new(2, 2), true);
        let inside = scene.place_token("orc", CellCoord::new(2, 2));
        let big = scene.place_token("dragon", CellCoord::new(0, 0));
        scene.resize_token(big, 3, 3);
        scene.place_token("rat", CellCoord::new(4, 4));

        let frame = scene.audience_frame();
        let ids: Vec<TokenId> = frame.tokens.iter().map(|s| s.token).collect();
        assert_eq!(ids, vec![inside, big]);
        assert_eq!(frame.tokens[0].rect, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(frame.tokens[1].rect, Rect::new(-200.0, -200.0, 100.0, 100.0));
    }

    #[test]
    fn test_take_frame_once_per_batch() {
        let mut scene = scene_500();
        assert!(scene.take_audience_frame().is_some());
        assert!(scene.take_audience_frame().is_none());

        scene.set_cell(CellCoord::new(0, 0), true);
        scene.set_cell(CellCoord::new(1, 0), true);
        let frame = scene.take_audience_frame().unwrap();
        assert_eq!(frame.viewport, Some(PixelRect::new(0, 0, 200, 100)));
        assert!(!scene.has_changes());

        // Unknown ids and no-op edits do not publish.
        scene.set_cell(CellCoord::new(0, 0), true);
        let id = scene.place_token("a", CellCoord::new(0, 0));
        scene.take_audience_frame();
        scene.remove_token(id);
        scene.take_audience_frame();
        scene.move_token(id, CellCoord::new(1, 1));
        scene.resize_token(id, 2, 2);
        assert!(scene.take_audience_frame().is_none());
    }

    #[test]
    fn test_map_mode_paints_cells() {
        let mut scene = scene_500();
        scene.pointer_down(center(0, 0));
        scene.pointer_drag(center(1, 0));
        scene.pointer_drag(center(2, 0));
        scene.pointer_up();
        scene.pointer_drag(center(3, 0));

        assert_eq!(scene.grid().revealed_count(), 3);
        assert!(!scene.grid().is_revealed(3, 0));
    }

    #[test]
    fn test_pointer_outside_grid_is_ignored() {
        let mut scene = scene_500();
        scene.take_audience_frame();
        scene.pointer_down(Point::new(-10.0, 20.0));
        scene.pointer_drag(center(1, 1));
        assert!(!scene.grid().has_selection());
        assert!(scene.take_audience_frame().is_none());
    }

    #[test]
    fn test_token_mode_drags_without_touching_grid() {
        let mut scene = scene_500();
        let id = scene.place_token("knight", CellCoord::new(1, 1));
        scene.set_mode(EditMode::Token);

        scene.pointer_down(center(1, 1));
        assert_eq!(scene.selected_token(), Some(id));
        scene.pointer_drag(center(4, 3));
        scene.pointer_up();

        assert_eq!(scene.tokens().get(id).unwrap().position(), CellCoord::new(4, 3));
        assert!(!scene.grid().has_selection());

        scene.pointer_down(center(0, 0));
        assert_eq!(scene.selected_token(), None);
    }

    #[test]
    fn test_cell_size_change_resets_reveal() {
        let mut scene = scene_500();
        scene.set_cell(CellCoord::new(1, 1), true);
        scene.set_cell_size(100);
        assert!(scene.grid().has_selection());
        scene.set_cell_size(50);
        assert!(!scene.grid().has_selection());
        assert_eq!(scene.grid().cols(), 10);
    }

    #[test]
    fn test_load_map_keeps_tokens() {
        let mut scene = scene_500();
        scene.set_cell(CellCoord::new(1, 1), true);
        scene.place_token("orc", CellCoord::new(1, 1));
        scene.load_map(Some("forest".to_string()), 800, 600, 40);
        assert_eq!(scene.grid().cols(), 20);
        assert!(!scene.grid().has_selection());
        assert_eq!(scene.tokens().len(), 1);
        assert_eq!(scene.map_id(), Some("forest"));
    }

    #[test]
    fn test_token_image_resolution() {
        let mut scene = scene_500();
        let image = Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(4, 4)));
        let seeded = scene.place_token_with_image("orc", CellCoord::new(0, 0), image.clone());
        let lazy = scene.place_token("orc", CellCoord::new(1, 0));

        assert!(scene.token_image(seeded, |_| None).is_some());
        assert!(scene.token_image(lazy, |_| None).is_none());
        assert!(scene.token_image(lazy, |_| Some(image.clone())).is_some());

        scene.invalidate_asset("orc");
        assert!(scene.token_image(seeded, |_| None).is_none());
    }

    #[test]
    fn test_crop_viewport() {
        let mut scene = scene_500();
        scene.set_cell(CellCoord::new(4, 4), true);
        let mut pixels = RgbaImage::new(500, 500);
        pixels.put_pixel(450, 450, Rgba([255, 0, 0, 255]));
        let image = DynamicImage::ImageRgba8(pixels);

        let cropped = scene.audience_frame().crop(&image).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (100, 100));
        assert_eq!(cropped.to_rgba8().get_pixel(50, 50), &Rgba([255, 0, 0, 255]));

        assert!(AudienceFrame::default().crop(&image).is_none());
    }
}
