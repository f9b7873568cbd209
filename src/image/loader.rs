//! Image loading with a bounded cache of encoded images.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{EmbeddedImage, is_local};

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<PathBuf, EmbeddedImage>,
    order: VecDeque<PathBuf>,
}

/// FIFO cache of encoded images, shared across exports of the same report.
#[derive(Debug, Default)]
pub struct ImageCache {
    inner: Mutex<CacheInner>,
    max_size: usize,
}

impl ImageCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            max_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<EmbeddedImage> {
        self.lock().entries.get(path).cloned()
    }

    /// Insert an image, evicting the oldest entries past capacity.
    pub fn insert(&self, path: PathBuf, image: EmbeddedImage) {
        let mut guard = self.lock();
        if guard.entries.contains_key(&path) {
            guard.entries.insert(path, image);
            return;
        }

        guard.order.push_back(path.clone());
        guard.entries.insert(path, image);

        while guard.entries.len() > self.max_size {
            let Some(oldest) = guard.order.pop_front() else {
                break;
            };
            guard.entries.remove(&oldest);
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves image urls against the report's directory and encodes them.
#[derive(Debug)]
pub struct ImageLoader {
    cache: ImageCache,
    base_path: PathBuf,
    enabled: bool,
}

impl ImageLoader {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            cache: ImageCache::new(32),
            base_path,
            enabled: true,
        }
    }

    /// When disabled every image becomes a placeholder.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Load and encode an image, using the cache if possible.
    ///
    /// Returns `None` for remote urls and for files that are missing or not
    /// decodable; callers draw a placeholder instead.
    pub fn embed(&self, url: &str) -> Option<EmbeddedImage> {
        if !self.enabled {
            return None;
        }
        if !is_local(url) {
            crate::perf::log_event("image.skip_remote", url);
            return None;
        }
        let full_path = self.resolve_path(url);
        if let Some(hit) = self.cache.get(&full_path) {
            return Some(hit);
        }

        let decoded = match image::open(&full_path) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!(path = %full_path.display(), %err, "image not loaded");
                return None;
            }
        };
        let embedded = EmbeddedImage::encode(&decoded)?;
        self.cache.insert(full_path, embedded.clone());
        Some(embedded)
    }

    fn resolve_path(&self, image_path: &str) -> PathBuf {
        let path = Path::new(image_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub const fn cache(&self) -> &ImageCache {
        &self.cache
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn sample(width: u32) -> EmbeddedImage {
        EmbeddedImage {
            data_uri: format!("data:{width}"),
            width,
            height: 1,
        }
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let cache = ImageCache::new(2);
        cache.insert(PathBuf::from("a"), sample(1));
        cache.insert(PathBuf::from("b"), sample(2));
        cache.insert(PathBuf::from("c"), sample(3));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(Path::new("a")));
        assert!(cache.contains(Path::new("c")));
    }

    #[test]
    fn test_cache_replace_keeps_size() {
        let cache = ImageCache::new(2);
        cache.insert(PathBuf::from("a"), sample(1));
        cache.insert(PathBuf::from("a"), sample(5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(Path::new("a")).map(|i| i.width), Some(5));
    }

    #[test]
    fn test_loader_resolve_path_relative() {
        let loader = ImageLoader::new(PathBuf::from("/base"));
        assert_eq!(
            loader.resolve_path("charts/a.png"),
            PathBuf::from("/base/charts/a.png")
        );
        assert_eq!(loader.resolve_path("/abs.png"), PathBuf::from("/abs.png"));
    }

    #[test]
    fn test_embed_reads_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255])));
        img.save(dir.path().join("dot.png")).unwrap();

        let loader = ImageLoader::new(dir.path().to_path_buf());
        let first = loader.embed("dot.png").expect("embedded");
        assert_eq!(first.width, 4);
        assert!(loader.cache().contains(&dir.path().join("dot.png")));
        assert_eq!(loader.embed("dot.png"), Some(first));
    }

    #[test]
    fn test_missing_and_remote_images_are_none() {
        let loader = ImageLoader::new(PathBuf::from("/nonexistent"));
        assert!(loader.embed("missing.png").is_none());
        assert!(loader.embed("https://example.com/x.png").is_none());
    }

    #[test]
    fn test_disabled_loader_embeds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        img.save(dir.path().join("dot.png")).unwrap();

        let loader = ImageLoader::new(dir.path().to_path_buf()).with_enabled(false);
        assert!(loader.embed("dot.png").is_none());
        assert!(loader.cache().is_empty());
    }
}
