// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tracks which camera projection the cluster AABBs were built for.

/// The projection generation the build stage last ran with.
///
/// Holds `None` after [`invalidate`](Self::invalidate), a sentinel no real
/// generation compares equal to, so the next frame always rebuilds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionCache {
    last_seen: Option<u64>,
}

impl ProjectionCache {
    /// An invalidated cache.
    pub const fn new() -> Self {
        Self { last_seen: None }
    }

    /// Forgets the cached generation.
    pub fn invalidate(&mut self) {
        self.last_seen = None;
    }

    /// `true` when the AABBs were not built for `generation`.
    pub fn needs_rebuild(&self, generation: u64) -> bool {
        self.last_seen != Some(generation)
    }

    /// Records that the AABBs now match `generation`.
    pub fn mark_built(&mut self, generation: u64) {
        self.last_seen = Some(generation);
    }

    /// Checks and marks in one step. Returns `true` if the caller must rebuild.
    pub fn take_rebuild(&mut self, generation: u64) -> bool {
        let rebuild = self.needs_rebuild(generation);
        if rebuild {
            self.mark_built(generation);
        }
        rebuild
    }

    /// The generation the AABBs match, if any.
    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_rebuilds_every_generation() {
        let cache = ProjectionCache::new();
        assert!(cache.needs_rebuild(0));
        assert!(cache.needs_rebuild(u64::MAX));
    }

    #[test]
    fn same_generation_rebuilds_once() {
        let mut cache = ProjectionCache::new();
        let rebuilds = (0..10).filter(|_| cache.take_rebuild(7)).count();
        assert_eq!(rebuilds, 1);
        assert_eq!(cache.last_seen(), Some(7));
    }

    #[test]
    fn invalidate_forces_a_rebuild_of_the_same_generation() {
        let mut cache = ProjectionCache::new();
        cache.mark_built(3);
        assert!(!cache.needs_rebuild(3));
        cache.invalidate();
        assert!(cache.needs_rebuild(3));
    }

    #[test]
    fn new_generation_rebuilds() {
        let mut cache = ProjectionCache::new();
        assert!(cache.take_rebuild(1));
        assert!(cache.take_rebuild(2));
        assert!(!cache.take_rebuild(2));
    }
}
