//! Image entity store
//!
//! The authoritative in-memory collection of gallery entities visible to
//! the presentation layer. Constructed once at application start and
//! threaded by `Arc` to everything that needs it; there is no ambient
//! singleton.
//!
//! The collection handle is an `Arc<Vec<Image>>`: a mutation that changes
//! nothing keeps the previous allocation current, so subscribers that
//! compare handles with `Arc::ptr_eq` can skip re-rendering. "Not yet
//! loaded" (`None`) is distinct from "loaded but empty" (`Some` of an
//! empty vec) — patches against an unloaded store are dropped.

use std::sync::{Arc, Mutex, Weak};

use shared::models::Image;

/// Collection handle handed to readers and subscribers
pub type Collection = Arc<Vec<Image>>;

type Listener = Arc<dyn Fn(&Collection) + Send + Sync>;

/// In-memory image store with synchronous subscriber fan-out
pub struct ImageStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    collection: Option<Collection>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

impl ImageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(StoreInner {
                collection: None,
                listeners: Vec::new(),
                next_listener_id: 0,
            }),
        })
    }

    /// Current collection, `None` until the first `replace_all`
    pub fn read(&self) -> Option<Collection> {
        self.inner.lock().unwrap().collection.clone()
    }

    /// Look up a single image by id
    pub fn get(&self, image_id: &str) -> Option<Image> {
        self.read()?.iter().find(|i| i.id == image_id).cloned()
    }

    /// Install a new collection wholesale and notify subscribers
    pub fn replace_all(&self, images: Vec<Image>) {
        let (collection, listeners) = {
            let mut inner = self.inner.lock().unwrap();
            let collection: Collection = Arc::new(images);
            inner.collection = Some(collection.clone());
            (collection, inner.listeners.clone())
        };
        Self::notify(&listeners, &collection);
    }

    /// Patch a single image in place
    ///
    /// The updater returns `false` to signal a no-op, in which case the
    /// previous collection handle stays current and nobody is notified.
    /// Patching an unloaded store, or an id that is not present, is a
    /// no-op as well.
    ///
    /// Returns `true` when a new collection was installed.
    pub fn patch<F>(&self, image_id: &str, updater: F) -> bool
    where
        F: FnOnce(&mut Image) -> bool,
    {
        self.patch_all(|images| {
            match images.iter_mut().find(|i| i.id == image_id) {
                Some(image) => updater(image),
                None => false,
            }
        })
    }

    /// Patch the whole collection
    ///
    /// Same no-op contract as [`patch`](Self::patch): the updater returns
    /// `false` to keep the previous handle current. Used for inserts and
    /// removals.
    pub fn patch_all<F>(&self, updater: F) -> bool
    where
        F: FnOnce(&mut Vec<Image>) -> bool,
    {
        let (collection, listeners) = {
            let mut inner = self.inner.lock().unwrap();
            let Some(current) = inner.collection.clone() else {
                return false;
            };

            let mut images = current.as_ref().clone();
            if !updater(&mut images) {
                return false;
            }

            let collection: Collection = Arc::new(images);
            inner.collection = Some(collection.clone());
            (collection, inner.listeners.clone())
        };
        Self::notify(&listeners, &collection);
        true
    }

    /// Register a change listener
    ///
    /// Listeners run synchronously after every effective mutation, in
    /// subscription order, receiving the freshly installed handle. The
    /// returned guard unsubscribes on drop.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> SubscriptionGuard
    where
        F: Fn(&Collection) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Arc::new(listener)));

        SubscriptionGuard {
            store: Arc::downgrade(self),
            id,
        }
    }

    // Fan-out runs outside the store lock so listeners can read (or even
    // mutate) the store without deadlocking.
    fn notify(listeners: &[(u64, Listener)], collection: &Collection) {
        for (_, listener) in listeners {
            listener(collection);
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.retain(|(lid, _)| *lid != id);
    }
}

/// Unsubscribes its listener when dropped
pub struct SubscriptionGuard {
    store: Weak<ImageStore>,
    id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn image(id: &str) -> Image {
        Image {
            id: id.to_string(),
            original_name: format!("{id}.jpg"),
            size: 100,
            secure_url: format!("https://cdn.example/{id}.jpg"),
            created_at: 0,
            updated_at: 0,
            is_public: false,
            downloads_count: 0,
            likes: vec![],
            transformed_images: vec![],
        }
    }

    #[test]
    fn test_unloaded_store_reads_none() {
        let store = ImageStore::new();
        assert!(store.read().is_none());

        store.replace_all(vec![]);
        // Loaded-but-empty is not the same thing as unloaded
        assert_eq!(store.read().unwrap().len(), 0);
    }

    #[test]
    fn test_patch_on_unloaded_store_is_noop() {
        let store = ImageStore::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        let _guard = store.subscribe(move |_| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!store.patch("img-1", |img| {
            img.downloads_count += 1;
            true
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_noop_patch_keeps_handle_identity() {
        let store = ImageStore::new();
        store.replace_all(vec![image("img-1")]);
        let before = store.read().unwrap();

        // Updater declines; same allocation must stay current
        assert!(!store.patch("img-1", |_| false));
        let after = store.read().unwrap();
        assert!(Arc::ptr_eq(&before, &after));

        // Missing id; same story
        assert!(!store.patch("img-2", |img| {
            img.downloads_count += 1;
            true
        }));
        assert!(Arc::ptr_eq(&before, &store.read().unwrap()));
    }

    #[test]
    fn test_effective_patch_installs_new_handle() {
        let store = ImageStore::new();
        store.replace_all(vec![image("img-1")]);
        let before = store.read().unwrap();

        assert!(store.patch("img-1", |img| {
            img.downloads_count += 1;
            true
        }));
        let after = store.read().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after[0].downloads_count, 1);
        // The old handle still sees the old value
        assert_eq!(before[0].downloads_count, 0);
    }

    #[test]
    fn test_subscribers_fire_in_subscription_order() {
        let store = ImageStore::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        let _g1 = store.subscribe(move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        let _g2 = store.subscribe(move |_| o2.lock().unwrap().push(2));

        store.replace_all(vec![image("img-1")]);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_on_guard_drop() {
        let store = ImageStore::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired2 = fired.clone();
        let guard = store.subscribe(move |_| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        store.replace_all(vec![]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        drop(guard);
        store.replace_all(vec![]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_sees_fully_applied_state() {
        let store = ImageStore::new();
        store.replace_all(vec![image("img-1")]);

        let seen = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        let _guard = store.subscribe(move |c| {
            *seen2.lock().unwrap() = Some(c[0].downloads_count);
        });

        store.patch("img-1", |img| {
            img.downloads_count = 42;
            true
        });
        assert_eq!(*seen.lock().unwrap(), Some(42));
    }
}
