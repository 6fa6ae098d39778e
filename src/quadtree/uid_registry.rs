use std::collections::HashSet;

use crate::quadtree::QuadTreeError;

pub type Uid = u64;

/// Hands out identifiers for stored items, one registry per tree.
/// Released automatic identifiers are reused before new ones are minted.
#[derive(Debug, Default)]
pub struct UidRegistry {
    live: HashSet<Uid>,
    free: Vec<Uid>,
    next: Uid,
}

impl UidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, preferred: Option<Uid>) -> Result<Uid, QuadTreeError> {
        if let Some(uid) = preferred {
            if !self.live.insert(uid) {
                return Err(QuadTreeError::DuplicateUid(uid));
            }
            return Ok(uid);
        }

        // a recycled value may have been claimed explicitly in the meantime
        while let Some(uid) = self.free.pop() {
            if self.live.insert(uid) {
                return Ok(uid);
            }
        }

        loop {
            let uid = self.next;
            self.next = self.next.wrapping_add(1);
            if self.live.insert(uid) {
                return Ok(uid);
            }
        }
    }

    /// returns false if the uid was not live
    pub fn release(&mut self, uid: Uid) -> bool {
        if !self.live.remove(&uid) {
            return false;
        }
        if uid < self.next {
            self.free.push(uid);
        }
        true
    }

    #[inline]
    pub fn is_live(&self, uid: Uid) -> bool {
        self.live.contains(&uid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.free.clear();
        self.next = 0;
    }
}
