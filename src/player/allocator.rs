const ARENA_CHUNK_SIZE: usize = 4096;

/// Chunked slot arena behind the handle types. Ids are slot index + 1 so
/// 0 stays available as a null handle. Slots recycle through a free
/// list; a released handle resolves to `None` until the slot is reused.
pub struct Arena<T> {
    chunks: Vec<Box<[Option<T>]>>,
    free_list: Vec<usize>,
    count: usize,
    next_slot: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena {
            chunks: Vec::new(),
            free_list: Vec::new(),
            count: 0,
            next_slot: 0,
        }
    }

    fn new_chunk() -> Box<[Option<T>]> {
        let mut chunk = Vec::with_capacity(ARENA_CHUNK_SIZE);
        chunk.resize_with(ARENA_CHUNK_SIZE, || None);
        chunk.into_boxed_slice()
    }

    fn ensure_chunk(&mut self, chunk_idx: usize) {
        while self.chunks.len() <= chunk_idx {
            self.chunks.push(Self::new_chunk());
        }
    }

    pub fn alloc(&mut self, value: T) -> usize {
        self.count += 1;
        if let Some(idx) = self.free_list.pop() {
            self.chunks[idx / ARENA_CHUNK_SIZE][idx % ARENA_CHUNK_SIZE] = Some(value);
            idx + 1
        } else {
            let idx = self.next_slot;
            self.ensure_chunk(idx / ARENA_CHUNK_SIZE);
            self.chunks[idx / ARENA_CHUNK_SIZE][idx % ARENA_CHUNK_SIZE] = Some(value);
            self.next_slot += 1;
            idx + 1
        }
    }

    pub fn remove(&mut self, id: usize) -> Option<T> {
        if id == 0 {
            return None;
        }
        let idx = id - 1;
        let chunk_idx = idx / ARENA_CHUNK_SIZE;
        if chunk_idx < self.chunks.len() {
            let slot_idx = idx % ARENA_CHUNK_SIZE;
            if let Some(value) = self.chunks[chunk_idx][slot_idx].take() {
                self.free_list.push(idx);
                self.count -= 1;
                Some(value)
            } else {
                None
            }
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, id: usize) -> Option<&T> {
        if id == 0 {
            return None;
        }
        let idx = id - 1;
        let chunk_idx = idx / ARENA_CHUNK_SIZE;
        if chunk_idx < self.chunks.len() {
            self.chunks[chunk_idx][idx % ARENA_CHUNK_SIZE].as_ref()
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        if id == 0 {
            return None;
        }
        let idx = id - 1;
        let chunk_idx = idx / ARENA_CHUNK_SIZE;
        if chunk_idx < self.chunks.len() {
            self.chunks[chunk_idx][idx % ARENA_CHUNK_SIZE].as_mut()
        } else {
            None
        }
    }

    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        if id == 0 {
            return false;
        }
        let idx = id - 1;
        let chunk_idx = idx / ARENA_CHUNK_SIZE;
        chunk_idx < self.chunks.len()
            && self.chunks[chunk_idx][idx % ARENA_CHUNK_SIZE].is_some()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Ids of all live slots, in slot order.
    pub fn ids(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.count);
        for idx in 0..self.next_slot {
            if self.chunks[idx / ARENA_CHUNK_SIZE][idx % ARENA_CHUNK_SIZE].is_some() {
                out.push(idx + 1);
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.free_list.clear();
        self.count = 0;
        self.next_slot = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_get_remove() {
        let mut arena: Arena<String> = Arena::new();
        let a = arena.alloc("a".to_string());
        let b = arena.alloc("b".to_string());
        assert_ne!(a, 0);
        assert_eq!(arena.get(a).map(|s| s.as_str()), Some("a"));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.remove(a), Some("a".to_string()));
        assert_eq!(arena.get(a), None);
        assert!(arena.contains(b));
    }

    #[test]
    fn test_slot_reuse() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc(1);
        arena.remove(a);
        let b = arena.alloc(2);
        assert_eq!(a, b);
        assert_eq!(arena.get(b), Some(&2));
    }

    #[test]
    fn test_null_handle() {
        let arena: Arena<u32> = Arena::new();
        assert_eq!(arena.get(0), None);
        assert!(!arena.contains(0));
    }

    #[test]
    fn test_ids_in_slot_order() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        let c = arena.alloc(3);
        arena.remove(b);
        assert_eq!(arena.ids(), vec![a, c]);
    }
}
