//! Inline PNG previews as `data:` URLs with explicit lifetimes.
//!
//! Every [`PreviewImage`] is registered in the [`PreviewStore`] that created it and unregistered
//! when the last handle drops, so a session that forgets to release an image shows up in
//! [`PreviewStore::live_count`].

use crate::error::PreviewError;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Something that turns diagram text into PNG bytes, usually a remote conversion endpoint.
#[async_trait]
pub trait PngSource: Send + Sync {
    async fn fetch_png(&self, code: &str) -> Result<Vec<u8>, PreviewError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: AtomicU64,
    live: Mutex<FxHashMap<u64, usize>>,
}

impl StoreInner {
    fn release(&self, id: u64) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        if live.remove(&id).is_some() {
            tracing::trace!(id, "preview image released");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    inner: Arc<StoreInner>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps PNG bytes into a `data:image/png;base64,` URL and registers it.
    pub fn register_png(&self, png: &[u8]) -> PreviewImage {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png));
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, png.len());
        PreviewImage {
            id,
            url,
            byte_len: png.len(),
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_live(&self, image: &PreviewImage) -> bool {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&image.id)
    }
}

/// A registered preview. Dropping it releases the registration.
#[derive(Debug)]
pub struct PreviewImage {
    id: u64,
    url: String,
    byte_len: usize,
    store: Weak<StoreInner>,
}

impl PreviewImage {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Size of the decoded PNG.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let payload = self
            .url
            .strip_prefix("data:image/png;base64,")
            .unwrap_or(&self.url);
        STANDARD.decode(payload)
    }

    pub fn release(self) {}
}

impl Drop for PreviewImage {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn register_and_release() {
        let store = PreviewStore::new();
        let a = store.register_png(PNG_MAGIC);
        let b = store.register_png(PNG_MAGIC);
        assert_eq!(store.live_count(), 2);
        assert!(a.url().starts_with("data:image/png;base64,iVBORw0KGgo"));
        assert_eq!(a.decode().unwrap(), PNG_MAGIC);
        a.release();
        assert_eq!(store.live_count(), 1);
        assert!(store.is_live(&b));
        drop(b);
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn images_outliving_the_store_drop_quietly() {
        let store = PreviewStore::new();
        let image = store.register_png(b"x");
        drop(store);
        assert_eq!(image.byte_len(), 1);
        drop(image);
    }
}
