//! Desktop Map
//!
//! Translates between guest-local desktop indices and the identifiers the
//! host uses for them. Rebuilt wholesale whenever the desktop configuration
//! changes; consulted by every desktop update.

use std::collections::HashMap;

/// Parallel lookup tables between guest desktop indices and host ids.
#[derive(Debug)]
pub struct DesktopMap {
    host_ids: Vec<u32>,
    indices: HashMap<u32, u32>,
}

impl DesktopMap {
    /// A single desktop with host id 0, the state before any configuration
    /// arrives.
    pub fn new() -> Self {
        let mut map = Self {
            host_ids: Vec::new(),
            indices: HashMap::new(),
        };
        map.rebuild(&[0]);
        map
    }

    /// Replace both tables; `host_ids[i]` is the host id of guest desktop `i`.
    pub fn rebuild(&mut self, host_ids: &[u32]) {
        self.host_ids = host_ids.to_vec();
        self.indices = host_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i as u32))
            .collect();
    }

    pub fn count(&self) -> u32 {
        self.host_ids.len() as u32
    }

    pub fn host_id(&self, index: u32) -> Option<u32> {
        self.host_ids.get(index as usize).copied()
    }

    pub fn index_of(&self, host_id: u32) -> Option<u32> {
        self.indices.get(&host_id).copied()
    }
}

impl Default for DesktopMap {
    fn default() -> Self {
        Self::new()
    }
}
