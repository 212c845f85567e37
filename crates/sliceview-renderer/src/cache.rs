use std::collections::BTreeMap;

use log::warn;
use uuid::Uuid;

use sliceview_core::{Scene2D, SceneLayer};

struct CacheEntry<T> {
    identifier: u64,
    revision: u64,
    payload: T,
}

/// Per-layer cached state keyed by scene depth.
///
/// An entry is rebuilt when its depth holds a layer with a different
/// identifier, updated when the layer revision moved past the cached one,
/// and dropped when its depth vanished from the scene. The cache also
/// remembers which scene it was built from; refreshing against another
/// scene resets everything.
pub struct RevisionCache<T> {
    scene_id: Option<Uuid>,
    entries: BTreeMap<i32, CacheEntry<T>>,
}

impl<T> Default for RevisionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RevisionCache<T> {
    pub fn new() -> Self {
        Self {
            scene_id: None,
            entries: BTreeMap::new(),
        }
    }

    /// Drops all entries and forgets the bound scene, handing the payloads
    /// back so callers can release external resources.
    pub fn reset(&mut self) -> Vec<T> {
        self.scene_id = None;
        std::mem::take(&mut self.entries)
            .into_values()
            .map(|entry| entry.payload)
            .collect()
    }

    /// Synchronizes the cache against the scene.
    ///
    /// `create` builds the payload for a layer this cache does not know
    /// yet; returning `None` marks the layer as not handled by this
    /// backend, and its depth is skipped. `update` refreshes an existing
    /// payload whose layer revision moved. Both receive `ctx` for access
    /// to backend resources. Returns the evicted payloads.
    pub fn sync<Ctx, C, U>(
        &mut self,
        scene: &Scene2D,
        ctx: &mut Ctx,
        mut create: C,
        mut update: U,
    ) -> Vec<T>
    where
        C: FnMut(&mut Ctx, &SceneLayer) -> Option<T>,
        U: FnMut(&mut Ctx, &mut T, &SceneLayer),
    {
        let mut evicted = Vec::new();

        if self.scene_id != Some(scene.id()) {
            if self.scene_id.is_some() {
                warn!(
                    "Refreshing against scene {} while cached state belongs to another scene, \
                     resetting",
                    scene.id()
                );
            }
            evicted.append(&mut self.reset());
            self.scene_id = Some(scene.id());
        }

        let mut previous = std::mem::take(&mut self.entries);

        for (depth, identifier, layer) in scene.layers() {
            let entry = match previous.remove(&depth) {
                Some(mut entry) if entry.identifier == identifier => {
                    if entry.revision < layer.revision() {
                        update(ctx, &mut entry.payload, layer);
                        entry.revision = layer.revision();
                    }
                    Some(entry)
                }
                stale => {
                    if let Some(stale) = stale {
                        evicted.push(stale.payload);
                    }
                    create(ctx, layer).map(|payload| CacheEntry {
                        identifier,
                        revision: layer.revision(),
                        payload,
                    })
                }
            };
            if let Some(entry) = entry {
                self.entries.insert(depth, entry);
            }
        }

        // Depths that vanished from the scene.
        evicted.extend(previous.into_values().map(|entry| entry.payload));
        evicted
    }

    pub fn get(&self, depth: i32) -> Option<&T> {
        self.entries.get(&depth).map(|entry| &entry.payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
