//! Decoded image cache keyed by asset id.

use super::{AssetLibrary, LibraryResult};
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Arc;

/// Decoded library images shared between the scene and the audience view.
///
/// Only successful loads are cached, so a failed load is retried on the
/// next request. Entries live until invalidated.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, Arc<DynamicImage>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached image, decoding it from the library on a miss.
    pub fn get_or_load(
        &mut self,
        library: &AssetLibrary,
        id: &str,
    ) -> LibraryResult<Arc<DynamicImage>> {
        if let Some(image) = self.entries.get(id) {
            return Ok(Arc::clone(image));
        }
        let image = Arc::new(library.decode_image(id)?);
        log::debug!("Cached image {} ({}x{})", id, image.width(), image.height());
        self.entries.insert(id.to_string(), Arc::clone(&image));
        Ok(image)
    }

    pub fn get(&self, id: &str) -> Option<Arc<DynamicImage>> {
        self.entries.get(id).cloned()
    }

    /// Forget one image, e.g. after its asset was replaced or deleted.
    pub fn invalidate(&mut self, id: &str) {
        self.entries.remove(id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
