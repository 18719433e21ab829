use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::core::clock::tick_before;
use crate::math::Vector4;

/// Identifier chosen by the embedding application
pub type ObjectId = u64;

/// Longest TTL the wrap-safe expiry comparison can represent
pub const MAX_TTL_MILLIS: u32 = i32::MAX as u32;

/// Where an object landed on screen in the most recent frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedProjection {
    pub screen: Vec2,
    /// View-space z; negative means behind the camera
    pub depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedObject {
    pub id: ObjectId,
    /// World position with w = 1
    pub position: Vector4,
    /// Absolute expiry tick in milliseconds
    pub expires_at: u32,
    /// Set by the most recent frame; `None` when that frame had no view
    pub projection: Option<CachedProjection>,
}

impl TrackedObject {
    /// Expired once `now` is strictly past the expiry tick
    pub fn is_expired(&self, now: u32) -> bool {
        tick_before(self.expires_at, now)
    }
}

/// Tracked objects in insertion order.
///
/// Not synchronized on its own; the engine keeps it behind its shared lock.
#[derive(Debug, Default, Clone)]
pub struct ObjectRegistry {
    objects: Vec<TrackedObject>,
    index: HashMap<ObjectId, usize>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholly replace the record for `id`.
    ///
    /// A replaced object keeps its original slot in iteration order.
    pub fn upsert(&mut self, id: ObjectId, position: Vec3, ttl_millis: u32, now: u32) {
        let record = TrackedObject {
            id,
            position: position.extend(1.0),
            expires_at: now.wrapping_add(ttl_millis.min(MAX_TTL_MILLIS)),
            projection: None,
        };

        match self.index.get(&id) {
            Some(&slot) => self.objects[slot] = record,
            None => {
                self.index.insert(id, self.objects.len());
                self.objects.push(record);
            }
        }
    }

    /// Drop every object whose expiry is strictly before `now`.
    /// Returns how many were removed.
    pub fn sweep(&mut self, now: u32) -> usize {
        let before = self.objects.len();
        self.objects.retain(|object| !object.is_expired(now));

        let removed = before - self.objects.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Remove one object; later objects keep their relative order
    pub fn remove(&mut self, id: ObjectId) -> Option<TrackedObject> {
        let slot = self.index.remove(&id)?;
        let object = self.objects.remove(slot);
        self.reindex();
        Some(object)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.index.clear();
    }

    pub fn get(&self, id: ObjectId) -> Option<&TrackedObject> {
        self.index.get(&id).map(|&slot| &self.objects[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.iter()
    }

    /// Mutable iteration in insertion order, used to cache projections
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedObject> {
        self.objects.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn reindex(&mut self) {
        self.index.clear();
        self.index
            .extend(self.objects.iter().enumerate().map(|(slot, object)| (object.id, slot)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_keeps_until_expiry() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::new(0.0, 0.0, 5.0), 100, 0);

        assert_eq!(registry.sweep(50), 0);
        assert_eq!(registry.len(), 1);

        // Expiry is inclusive
        assert_eq!(registry.sweep(100), 0);
        assert_eq!(registry.sweep(150), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_upsert_overwrites_whole_record() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(7, Vec3::new(1.0, 2.0, 3.0), 100, 0);
        registry.iter_mut().for_each(|object| {
            object.projection = Some(CachedProjection {
                screen: Vec2::ONE,
                depth: 1.0,
            })
        });

        registry.upsert(7, Vec3::new(4.0, 5.0, 6.0), 10, 20);

        let object = registry.get(7).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(object.position, Vector4::new(4.0, 5.0, 6.0, 1.0));
        assert_eq!(object.expires_at, 30);
        assert_eq!(object.projection, None);
    }

    #[test]
    fn test_refresh_keeps_insertion_slot() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::ZERO, 100, 0);
        registry.upsert(2, Vec3::ZERO, 100, 0);
        registry.upsert(3, Vec3::ZERO, 100, 0);
        registry.upsert(1, Vec3::ONE, 100, 0);

        let ids: Vec<_> = registry.iter().map(|object| object.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_sweep_preserves_order_and_index() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(10, Vec3::ZERO, 50, 0);
        registry.upsert(20, Vec3::ZERO, 500, 0);
        registry.upsert(30, Vec3::ZERO, 20, 0);
        registry.upsert(40, Vec3::ZERO, 500, 0);

        assert_eq!(registry.sweep(100), 2);
        let ids: Vec<_> = registry.iter().map(|object| object.id).collect();
        assert_eq!(ids, vec![20, 40]);
        assert_eq!(registry.get(40).map(|o| o.id), Some(40));
        assert!(registry.get(10).is_none());

        registry.upsert(40, Vec3::ONE, 500, 100);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_expiry_across_clock_wrap() {
        let mut registry = ObjectRegistry::new();
        let now = u32::MAX - 30;
        registry.upsert(1, Vec3::ZERO, 100, now);

        // Expiry wrapped to 69
        assert_eq!(registry.get(1).unwrap().expires_at, 69);
        assert_eq!(registry.sweep(u32::MAX), 0);
        assert_eq!(registry.sweep(40), 0);
        assert_eq!(registry.sweep(70), 1);
    }

    #[test]
    fn test_ttl_is_clamped() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::ZERO, u32::MAX, 0);
        assert_eq!(registry.sweep(1_000_000), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry = ObjectRegistry::new();
        registry.upsert(1, Vec3::ZERO, 100, 0);
        registry.upsert(2, Vec3::ZERO, 100, 0);

        assert_eq!(registry.remove(1).map(|o| o.id), Some(1));
        assert!(registry.remove(1).is_none());
        assert_eq!(registry.get(2).map(|o| o.id), Some(2));

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get(2).is_none());
    }
}
