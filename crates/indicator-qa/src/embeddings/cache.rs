use anyhow::Result;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

use super::EmbeddingModel;

/// LRU cache in front of any embedding model. Only query vectors are cached;
/// documents are embedded once at index build time anyway.
pub struct CachedEmbeddings<M> {
    inner: M,
    cache: Mutex<lru::LruCache<String, Vec<f32>>>,
}

impl<M: EmbeddingModel> CachedEmbeddings<M> {
    pub fn new(inner: M, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(lru::LruCache::new(capacity)),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }
}

impl<M: EmbeddingModel> EmbeddingModel for CachedEmbeddings<M> {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().get(text) {
            return Ok(cached.clone());
        }
        let embedding = self.inner.embed_query(text)?;
        self.cache.lock().put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed_document(text)
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.inner.embed_documents(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl EmbeddingModel for Counting {
        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }
        fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_query(text)
        }
        fn dimension(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_repeated_query_hits_cache() {
        let cached = CachedEmbeddings::new(
            Counting {
                calls: AtomicUsize::new(0),
            },
            4,
        );
        assert_eq!(cached.embed_query("gdp").unwrap(), vec![3.0]);
        assert_eq!(cached.embed_query("gdp").unwrap(), vec![3.0]);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cached_len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cached = CachedEmbeddings::new(
            Counting {
                calls: AtomicUsize::new(0),
            },
            1,
        );
        cached.embed_query("a").unwrap();
        cached.embed_query("bb").unwrap();
        cached.embed_query("a").unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_entries_are_keyed_by_full_text() {
        let cached = CachedEmbeddings::new(
            Counting {
                calls: AtomicUsize::new(0),
            },
            8,
        );
        assert_eq!(cached.embed_query("gdp").unwrap(), vec![3.0]);
        assert_eq!(cached.embed_query("gdp growth").unwrap(), vec![10.0]);
        assert_eq!(cached.embed_query("GDP").unwrap(), vec![3.0]);
        assert_eq!(cached.cached_len(), 3);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 3);
    }
}
