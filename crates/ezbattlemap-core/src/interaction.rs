//! Pointer gestures on the controller: painting reveal state and dragging tokens.
//!
//! Both gestures only react to cells inside the grid. Pointer positions off
//! the grid are ignored rather than clamped.

use crate::grid::{CellCoord, Grid};
use crate::tokens::{TokenId, TokenLayer};

/// A press-and-drag stroke that paints cells revealed or hidden.
///
/// The pressed cell decides the paint value: a hidden cell starts a reveal
/// stroke, a revealed one starts a hide stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealStroke {
    reveal: bool,
    last: CellCoord,
}

impl RevealStroke {
    /// Start a stroke at `cell`, painting it immediately.
    pub fn begin(grid: &mut Grid, cell: CellCoord) -> Option<Self> {
        if !grid.contains(cell) {
            return None;
        }
        let reveal = !grid.is_revealed(cell.x, cell.y);
        grid.set_cell(cell.x, cell.y, reveal);
        Some(Self { reveal, last: cell })
    }

    /// Whether this stroke reveals (true) or hides (false) cells.
    pub fn reveals(&self) -> bool {
        self.reveal
    }

    /// Continue the stroke onto `cell`. Returns true if a cell was painted.
    pub fn extend(&mut self, grid: &mut Grid, cell: CellCoord) -> bool {
        if cell == self.last || !grid.contains(cell) {
            return false;
        }
        grid.set_cell(cell.x, cell.y, self.reveal);
        self.last = cell;
        true
    }
}

/// A token being dragged from cell to cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDrag {
    token: TokenId,
}

impl TokenDrag {
    /// Grab the topmost token under `cell`, if any.
    pub fn begin(tokens: &TokenLayer, grid: &Grid, cell: CellCoord) -> Option<Self> {
        if !grid.contains(cell) {
            return None;
        }
        tokens
            .token_at(cell.x, cell.y)
            .map(|token| Self { token: token.id() })
    }

    /// The grabbed token.
    pub fn token(&self) -> TokenId {
        self.token
    }

    /// Move the grabbed token to `cell`. Returns true if it moved.
    ///
    /// A token removed mid-drag simply stops moving.
    pub fn extend(&self, tokens: &mut TokenLayer, grid: &Grid, cell: CellCoord) -> bool {
        if !grid.contains(cell) {
            return false;
        }
        match tokens.get(self.token) {
            Some(token) if token.position() != cell => tokens.move_to(self.token, cell.x, cell.y),
            _ => false,
        }
    }
}
