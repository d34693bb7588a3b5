use std::collections::HashMap;

use itertools::Itertools;
use nohash_hasher::BuildNoHashHasher;

use crate::player::DisplayObjectId;

type IntMap<K, V> = HashMap<K, V, BuildNoHashHasher<K>>;

/// Depth-keyed children of one timeline. A depth holds at most one
/// object; placing over an occupied depth evicts the occupant and
/// returns it so the caller can release the handle.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    by_depth: IntMap<u16, DisplayObjectId>,
}

impl DisplayList {
    pub fn new() -> DisplayList {
        DisplayList::default()
    }

    pub fn place(&mut self, depth: u16, id: DisplayObjectId) -> Option<DisplayObjectId> {
        self.by_depth.insert(depth, id)
    }

    pub fn remove(&mut self, depth: u16) -> Option<DisplayObjectId> {
        self.by_depth.remove(&depth)
    }

    pub fn get(&self, depth: u16) -> Option<DisplayObjectId> {
        self.by_depth.get(&depth).copied()
    }

    pub fn len(&self) -> usize {
        self.by_depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_depth.is_empty()
    }

    /// Children in ascending depth order, the paint/traversal order.
    pub fn children(&self) -> Vec<(u16, DisplayObjectId)> {
        self.by_depth
            .iter()
            .map(|(depth, id)| (*depth, *id))
            .sorted_by_key(|(depth, _)| *depth)
            .collect()
    }

    pub fn ids(&self) -> Vec<DisplayObjectId> {
        self.children().into_iter().map(|(_, id)| id).collect()
    }

    pub fn clear(&mut self) -> Vec<DisplayObjectId> {
        let ids = self.ids();
        self.by_depth.clear();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_is_unique() {
        let mut list = DisplayList::new();
        assert_eq!(list.place(5, 10), None);
        assert_eq!(list.place(5, 20), Some(10));
        assert_eq!(list.get(5), Some(20));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_children_sorted_by_depth() {
        let mut list = DisplayList::new();
        list.place(9, 1);
        list.place(2, 2);
        list.place(5, 3);
        assert_eq!(list.children(), vec![(2, 2), (5, 3), (9, 1)]);
    }

    #[test]
    fn test_remove() {
        let mut list = DisplayList::new();
        list.place(1, 7);
        assert_eq!(list.remove(1), Some(7));
        assert_eq!(list.remove(1), None);
    }
}
