//! Keeps the most recently rendered page (or spread)

use std::sync::Arc;

use super::bitmap::Bitmap;

/// Identifies what a cached render was produced from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page index (left page for spreads)
    pub page: usize,
    /// Zoom factor stored as hundredths for stable comparison
    pub zoom_hundredths: u32,
    /// Whether the render is a two-page spread
    pub spread: bool,
}

impl CacheKey {
    #[must_use]
    pub fn new(page: usize, zoom: f32, spread: bool) -> Self {
        Self {
            page,
            zoom_hundredths: (zoom * 100.0).round() as u32,
            spread,
        }
    }
}

/// Single-entry render cache.
///
/// A failed render is remembered too, so a broken page is not re-rasterized
/// (and re-logged) on every redraw.
#[derive(Default)]
pub struct LastRender {
    entry: Option<(CacheKey, Option<Arc<Bitmap>>)>,
}

impl LastRender {
    /// Cached result for `key`, if the last render matches it
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Option<Arc<Bitmap>>> {
        match &self.entry {
            Some((cached, bitmap)) if cached == key => Some(bitmap.clone()),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: CacheKey, bitmap: Option<Bitmap>) -> Option<Arc<Bitmap>> {
        let bitmap = bitmap.map(Arc::new);
        self.entry = Some((key, bitmap.clone()));
        bitmap
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;

    #[test]
    fn hit_only_for_same_key() {
        let mut cache = LastRender::default();
        let key = CacheKey::new(3, 1.2, false);
        cache.insert(key, Some(RgbaImage::new(2, 2)));

        assert!(cache.get(&CacheKey::new(3, 1.2, false)).is_some());
        assert!(cache.get(&CacheKey::new(3, 1.3, false)).is_none());
        assert!(cache.get(&CacheKey::new(3, 1.2, true)).is_none());
        assert!(cache.get(&CacheKey::new(4, 1.2, false)).is_none());
    }

    #[test]
    fn new_insert_replaces_previous_entry() {
        let mut cache = LastRender::default();
        cache.insert(CacheKey::new(0, 1.0, false), Some(RgbaImage::new(1, 1)));
        cache.insert(CacheKey::new(1, 1.0, false), None);

        assert!(cache.get(&CacheKey::new(0, 1.0, false)).is_none());
        assert!(matches!(
            cache.get(&CacheKey::new(1, 1.0, false)),
            Some(None)
        ));
    }

    #[test]
    fn invalidate_clears_entry() {
        let mut cache = LastRender::default();
        let key = CacheKey::new(0, 1.0, false);
        cache.insert(key, Some(RgbaImage::new(1, 1)));
        cache.invalidate();
        assert!(cache.get(&key).is_none());
    }
}
