//! Explicit registration of live objects.

use super::record::{Inspect, ObjectRecord};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

/// Weakly tracks registered values so the census can enumerate the live ones.
#[derive(Default)]
pub struct ObjectRegistry {
    entries: Mutex<Vec<Weak<dyn Inspect>>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static ObjectRegistry {
        static GLOBAL: OnceLock<ObjectRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ObjectRegistry::new)
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Weak<dyn Inspect>>> {
        // A panic while holding the lock leaves the list itself intact
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wraps `value` in an `Arc` and registers it.
    pub fn track<T: Inspect + 'static>(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.register(&value);
        value
    }

    /// Registers an existing shared value.
    pub fn register<T: Inspect + 'static>(&self, value: &Arc<T>) {
        let erased: Arc<dyn Inspect> = value.clone();
        self.entries().push(Arc::downgrade(&erased));
    }

    /// Forgets entries whose value has been dropped. Returns how many were removed.
    pub fn collect(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|weak| weak.strong_count() > 0);
        before - entries.len()
    }

    /// Records for the values still alive, in registration order.
    pub fn enumerate(&self) -> Vec<ObjectRecord> {
        let live: Vec<Arc<dyn Inspect>> = self.entries().iter().filter_map(Weak::upgrade).collect();
        // Rendering happens outside the lock so `Debug` impls may register objects
        live.iter().map(|value| value.record()).collect()
    }

    /// Number of tracked entries, including dropped ones not yet collected.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_in_registration_order() {
        let registry = ObjectRegistry::new();
        let _a = registry.track(1u32);
        let _b = registry.track(String::from("two"));
        let _c = registry.track(vec![3u8]);

        let names: Vec<String> = registry
            .enumerate()
            .iter()
            .map(|r| r.type_name().to_string())
            .collect();

        assert_eq!(
            names,
            vec!["u32", "alloc::string::String", "alloc::vec::Vec<u8>"]
        );
    }

    #[test]
    fn test_dropped_values_are_not_enumerated() {
        let registry = ObjectRegistry::new();
        let kept = registry.track(1u32);
        drop(registry.track(2u32));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.enumerate().len(), 1);

        assert_eq!(registry.collect(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.enumerate()[0].repr(), Ok("1"));
        drop(kept);

        assert_eq!(registry.collect(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_shared_value() {
        let registry = ObjectRegistry::new();
        let shared = Arc::new(vec![1u16, 2, 3]);
        registry.register(&shared);

        assert_eq!(Arc::strong_count(&shared), 1);
        assert_eq!(registry.enumerate()[0].repr(), Ok("[1, 2, 3]"));
    }
}
