use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use speed_core::StoreError;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Raw path-addressed object storage.
///
/// Backends never rename or retry: `upload` fails with
/// [`StoreError::AlreadyExists`] when the path is taken, and the caller
/// decides what to do about it.
pub trait ObjectBackend: Send + Sync {
    /// Ask the service whether the configured credential is still valid.
    fn check_token(&self) -> StoreFuture<'_, bool>;

    fn is_dir<'a>(&'a self, path: &'a str) -> StoreFuture<'a, bool>;

    fn mkdir<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()>;

    fn upload<'a>(&'a self, path: &'a str, bytes: &'a [u8]) -> StoreFuture<'a, ()>;

    /// Make the object public and return a download link for it.
    fn publish<'a>(&'a self, path: &'a str) -> StoreFuture<'a, String>;

    /// Names of the entries directly under `dir`.
    fn list<'a>(&'a self, dir: &'a str) -> StoreFuture<'a, Vec<String>>;

    fn download<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Vec<u8>>;

    fn remove<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()>;

    /// Backend name for logging and configuration.
    fn backend_name(&self) -> &str;
}

/// In-memory backend for testing.
///
/// Records every upload attempt so tests can assert which names were tried.
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
    attempts: Mutex<Vec<String>>,
    token_valid: AtomicBool,
    token_checks: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
            attempts: Mutex::new(Vec::new()),
            token_valid: AtomicBool::new(true),
            token_checks: AtomicUsize::new(0),
        }
    }

    /// Pre-populate an object, e.g. to force a name collision.
    pub fn with_object(self, path: &str, bytes: &[u8]) -> Self {
        lock(&self.objects).insert(path.to_string(), bytes.to_vec());
        self
    }

    pub fn set_token_valid(&self, valid: bool) {
        self.token_valid.store(valid, Ordering::SeqCst);
    }

    pub fn token_checks(&self) -> usize {
        self.token_checks.load(Ordering::SeqCst)
    }

    pub fn upload_attempts(&self) -> Vec<String> {
        lock(&self.attempts).clone()
    }

    pub fn contains(&self, path: &str) -> bool {
        lock(&self.objects).contains_key(path)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        lock(&self.dirs).contains(path)
    }

    fn authorized(&self) -> Result<(), StoreError> {
        if self.token_valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::TokenInvalid)
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ObjectBackend for MemoryBackend {
    fn check_token(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.token_checks.fetch_add(1, Ordering::SeqCst);
            Ok(self.token_valid.load(Ordering::SeqCst))
        })
    }

    fn is_dir<'a>(&'a self, path: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.authorized()?;
            Ok(lock(&self.dirs).contains(path))
        })
    }

    fn mkdir<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.authorized()?;
            if !lock(&self.dirs).insert(path.to_string()) {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
            Ok(())
        })
    }

    fn upload<'a>(&'a self, path: &'a str, bytes: &'a [u8]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.authorized()?;
            lock(&self.attempts).push(path.to_string());
            let mut objects = lock(&self.objects);
            if objects.contains_key(path) {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
            objects.insert(path.to_string(), bytes.to_vec());
            Ok(())
        })
    }

    fn publish<'a>(&'a self, path: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            self.authorized()?;
            if !lock(&self.objects).contains_key(path) {
                return Err(StoreError::NotFound(path.to_string()));
            }
            Ok(format!("memory://{path}"))
        })
    }

    fn list<'a>(&'a self, dir: &'a str) -> StoreFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.authorized()?;
            let prefix = format!("{}/", dir.trim_end_matches('/'));
            let names = lock(&self.objects)
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('/'))
                .map(str::to_string)
                .collect();
            Ok(names)
        })
    }

    fn download<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(async move {
            self.authorized()?;
            lock(&self.objects)
                .get(path)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(path.to_string()))
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.authorized()?;
            lock(&self.objects)
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(path.to_string()))
        })
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
