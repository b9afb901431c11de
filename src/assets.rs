use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;

use crate::error::{SlidesmithError, SlidesmithResult};

pub mod decode;
pub mod svg;

/// Reference to a slide background or logo image.
///
/// `source` is either a deck-relative file path or a `mem:` key for bytes
/// registered with [`ImageStore::insert_memory`] (used by tests and by
/// upstream image resolvers that hand back raw bytes).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ImageRef {
    pub source: String,
}

impl ImageRef {
    pub fn path(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn memory(key: &str) -> Self {
        Self {
            source: format!("mem:{key}"),
        }
    }

    pub fn is_memory(&self) -> bool {
        self.source.starts_with("mem:")
    }
}

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Image-loading capability consumed by the compositor.
pub trait ImageLoader {
    fn load(&mut self, image: &ImageRef) -> SlidesmithResult<Arc<PreparedImage>>;
}

/// Filesystem-and-memory image cache keyed by normalized source.
pub struct ImageStore {
    root: PathBuf,
    memory: HashMap<String, Arc<Vec<u8>>>,
    cache: HashMap<String, Arc<PreparedImage>>,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            memory: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Register encoded image bytes under `mem:key`.
    pub fn insert_memory(&mut self, key: &str, bytes: Vec<u8>) -> ImageRef {
        self.memory.insert(key.to_string(), Arc::new(bytes));
        self.cache.remove(&format!("mem:{key}"));
        ImageRef::memory(key)
    }

    fn fetch_bytes(&self, image: &ImageRef) -> SlidesmithResult<Arc<Vec<u8>>> {
        if let Some(key) = image.source.strip_prefix("mem:") {
            return self
                .memory
                .get(key)
                .cloned()
                .ok_or_else(|| SlidesmithError::render(format!("unknown memory image '{key}'")));
        }

        let rel = normalize_rel_path(&image.source)?;
        let path = self.root.join(&rel);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read image '{}'", path.display()))?;
        Ok(Arc::new(bytes))
    }
}

impl ImageLoader for ImageStore {
    fn load(&mut self, image: &ImageRef) -> SlidesmithResult<Arc<PreparedImage>> {
        if let Some(prepared) = self.cache.get(&image.source) {
            return Ok(prepared.clone());
        }

        let bytes = self.fetch_bytes(image)?;
        let prepared = if Path::new(&image.source)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
        {
            svg::rasterize_svg(&bytes)?
        } else {
            decode::decode_image(&bytes)?
        };

        let prepared = Arc::new(prepared);
        self.cache.insert(image.source.clone(), prepared.clone());
        Ok(prepared)
    }
}

/// Normalize and validate deck-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> SlidesmithResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(SlidesmithError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(SlidesmithError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(SlidesmithError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(SlidesmithError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(r: u8, g: u8, b: u8) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([r, g, b, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn normalize_accepts_and_cleans_relative_paths() {
        assert_eq!(normalize_rel_path("a/./b.png").unwrap(), "a/b.png");
        assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    }

    #[test]
    fn normalize_rejects_escapes() {
        assert!(normalize_rel_path("/etc/passwd").is_err());
        assert!(normalize_rel_path("../up.png").is_err());
        assert!(normalize_rel_path("").is_err());
        assert!(normalize_rel_path("./.").is_err());
    }

    #[test]
    fn memory_images_decode_and_cache() {
        let mut store = ImageStore::new(".");
        let image = store.insert_memory("bg", png_bytes(10, 20, 30));
        assert!(image.is_memory());

        let a = store.load(&image).unwrap();
        let b = store.load(&image).unwrap();
        assert_eq!(a.width, 2);
        assert_eq!(a.height, 2);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_memory_key_is_an_error() {
        let mut store = ImageStore::new(".");
        assert!(store.load(&ImageRef::memory("missing")).is_err());
    }

    #[test]
    fn filesystem_images_load_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bg.png"), png_bytes(1, 2, 3)).unwrap();

        let mut store = ImageStore::new(dir.path());
        let prepared = store.load(&ImageRef::path("bg.png")).unwrap();
        assert_eq!((prepared.width, prepared.height), (2, 2));

        assert!(store.load(&ImageRef::path("missing.png")).is_err());
    }
}
