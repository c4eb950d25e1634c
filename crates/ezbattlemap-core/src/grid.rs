//! Grid partition of a map image and its fog-of-war reveal state.
//!
//! The image is cut into square cells of `cell_size` pixels. Cells on the
//! right and bottom edges may overhang the image; every rectangle handed
//! out by this module is clipped back to the image bounds.

use kurbo::{Point, Rect};

/// Default edge length of a grid square in pixels.
pub const DEFAULT_CELL_SIZE: u32 = 100;

/// Integer address of a grid cell.
///
/// Coordinates are signed because pointer input and token positions can
/// fall outside the grid; lookups treat those as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check if a pixel lies inside the rectangle.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Convert to a floating-point rectangle for rendering and intersection.
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.x as f64,
            self.y as f64,
            self.right() as f64,
            self.bottom() as f64,
        )
    }
}

/// The grid laid over the active map image.
///
/// Reveal state is a dense row-major matrix (`row * cols + col`). Any change
/// to the cell size or the image dimensions reallocates it, so the previous
/// selection is discarded.
#[derive(Debug, Clone)]
pub struct Grid {
    cell_size: u32,
    image_width: u32,
    image_height: u32,
    cols: u32,
    rows: u32,
    revealed: Vec<bool>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    /// Create an empty grid with the default cell size and no image.
    pub fn new() -> Self {
        Self::with_image(0, 0, DEFAULT_CELL_SIZE)
    }

    /// Create a grid over an image of the given size.
    ///
    /// A zero `cell_size` falls back to [`DEFAULT_CELL_SIZE`].
    pub fn with_image(width: u32, height: u32, cell_size: u32) -> Self {
        let mut grid = Self {
            cell_size: if cell_size == 0 { DEFAULT_CELL_SIZE } else { cell_size },
            image_width: width,
            image_height: height,
            cols: 0,
            rows: 0,
            revealed: Vec::new(),
        };
        grid.recompute();
        grid
    }

    /// Edge length of one grid square in image pixels.
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Number of cell columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of cell rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Width of the covered image in pixels.
    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    /// Height of the covered image in pixels.
    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    /// The larger of the two grid dimensions.
    pub fn grid_size(&self) -> u32 {
        self.cols.max(self.rows)
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.revealed.len()
    }

    /// Change the grid square size. Zero or an unchanged size is ignored.
    pub fn set_cell_size(&mut self, size: u32) {
        if size == 0 || size == self.cell_size {
            return;
        }
        self.cell_size = size;
        self.recompute();
    }

    /// Change the image dimensions the grid covers.
    pub fn set_image_dimensions(&mut self, width: u32, height: u32) {
        self.image_width = width;
        self.image_height = height;
        self.recompute();
    }

    fn recompute(&mut self) {
        if self.image_width > 0 && self.image_height > 0 {
            self.cols = self.image_width.div_ceil(self.cell_size);
            self.rows = self.image_height.div_ceil(self.cell_size);
        } else {
            self.cols = 0;
            self.rows = 0;
        }
        self.revealed = vec![false; self.cols as usize * self.rows as usize];
        log::debug!(
            "Grid recomputed: {}x{} cells of {}px over {}x{} image",
            self.cols,
            self.rows,
            self.cell_size,
            self.image_width,
            self.image_height
        );
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.cols || y >= self.rows {
            return None;
        }
        Some(y as usize * self.cols as usize + x as usize)
    }

    /// Set the reveal state of a cell. Out-of-range cells are ignored.
    pub fn set_cell(&mut self, x: i32, y: i32, revealed: bool) {
        if let Some(i) = self.index(x, y) {
            self.revealed[i] = revealed;
        }
    }

    /// Flip the reveal state of a cell. Out-of-range cells are ignored.
    pub fn toggle_cell(&mut self, x: i32, y: i32) {
        if let Some(i) = self.index(x, y) {
            self.revealed[i] = !self.revealed[i];
        }
    }

    /// Whether a cell is revealed. Out-of-range cells are never revealed.
    pub fn is_revealed(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.revealed[i])
    }

    /// Check if a cell address lies inside the grid.
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell.x, cell.y).is_some()
    }

    /// Hide every cell.
    pub fn clear(&mut self) {
        self.revealed.fill(false);
    }

    /// Whether at least one cell is revealed.
    pub fn has_selection(&self) -> bool {
        self.revealed.iter().any(|&r| r)
    }

    /// Number of revealed cells.
    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|&&r| r).count()
    }

    /// Cell containing an image-space point, or `None` outside the grid.
    pub fn cell_at(&self, point: Point) -> Option<CellCoord> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }
        let size = self.cell_size as f64;
        let x = (point.x / size).floor();
        let y = (point.y / size).floor();
        let in_range = |v: f64| v >= i32::MIN as f64 && v <= i32::MAX as f64;
        if !in_range(x) || !in_range(y) {
            return None;
        }
        let cell = CellCoord::new(x as i32, y as i32);
        self.contains(cell).then_some(cell)
    }

    /// Pixel rectangle of one cell clipped to the image, or `None` if out of range.
    pub fn cell_rectangle(&self, x: i32, y: i32) -> Option<PixelRect> {
        self.index(x, y).map(|_| self.clipped_cell(x as u32, y as u32))
    }

    // Callers guarantee x < cols and y < rows, so the cell origin is inside the image.
    fn clipped_cell(&self, x: u32, y: u32) -> PixelRect {
        let left = x * self.cell_size;
        let top = y * self.cell_size;
        PixelRect::new(
            left,
            top,
            self.cell_size.min(self.image_width - left),
            self.cell_size.min(self.image_height - top),
        )
    }

    /// Tightest rectangle enclosing every revealed cell, clamped to the image.
    ///
    /// This is the audience display's crop region. It is a bounding box, so
    /// hidden cells inside it must still be masked with
    /// [`Grid::unrevealed_cell_rectangles`].
    pub fn compute_viewport(&self) -> Option<PixelRect> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max: Option<(u32, u32)> = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                if self.revealed[y as usize * self.cols as usize + x as usize] {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    let (mx, my) = max.unwrap_or((x, y));
                    max = Some((mx.max(x), my.max(y)));
                }
            }
        }

        let (max_x, max_y) = max?;
        let left = min_x * self.cell_size;
        let top = min_y * self.cell_size;
        let right = ((max_x as u64 + 1) * self.cell_size as u64).min(self.image_width as u64);
        let bottom = ((max_y as u64 + 1) * self.cell_size as u64).min(self.image_height as u64);
        Some(PixelRect::new(
            left,
            top,
            (right - left as u64) as u32,
            (bottom - top as u64) as u32,
        ))
    }

    /// One clipped rectangle per hidden cell, in row-major order.
    ///
    /// Together with the revealed cells these tile the image exactly.
    pub fn unrevealed_cell_rectangles(&self) -> Vec<PixelRect> {
        let mut rects = Vec::with_capacity(self.revealed.len() - self.revealed_count());
        for y in 0..self.rows {
            for x in 0..self.cols {
                if !self.revealed[y as usize * self.cols as usize + x as usize] {
                    rects.push(self.clipped_cell(x, y));
                }
            }
        }
        rects
    }
}
