use std::hash::Hash;
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

/// Generational index into a [`Pool`].
///
/// Handles are plain data so they can be embedded in command payloads.
/// Generation `0` is never handed out, which makes the zeroed / default
/// handle a reliable "nothing" value.
#[repr(C)]
pub struct Handle<T> {
    pub slot: u16,
    pub generation: u16,
    phantom: PhantomData<T>,
}

impl<T> Handle<T> {
    pub fn new(slot: u16, generation: u16) -> Self {
        Self {
            slot,
            generation,
            phantom: PhantomData,
        }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.generation != 0
    }

    /// Reinterprets the handle for another resource type.
    pub(crate) fn cast<U>(self) -> Handle<U> {
        Handle::new(self.slot, self.generation)
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({}v{})", self.slot, self.generation)
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

unsafe impl<T> Zeroable for Handle<T> {}
unsafe impl<T: 'static> Pod for Handle<T> {}

/// Slot arena with generation counters to detect stale handles.
pub struct Pool<T> {
    items: Vec<Option<T>>,
    empty: Vec<usize>,
    generation: Vec<u16>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        const INITIAL_SIZE: usize = 64;
        Self::new(INITIAL_SIZE)
    }
}

impl<T> Pool<T> {
    pub fn new(initial_size: usize) -> Self {
        let mut p = Pool {
            items: Vec::with_capacity(initial_size),
            empty: Vec::with_capacity(initial_size),
            generation: vec![1; initial_size],
        };

        // Reversed so slots are handed out in ascending order.
        p.empty = (0..initial_size).rev().collect();
        p.items.resize_with(initial_size, || None);

        p
    }

    fn grow(&mut self) -> Option<()> {
        let old = self.items.len();
        let new = (old * 2).max(16).min(u16::MAX as usize + 1);
        if new == old {
            return None;
        }

        self.items.resize_with(new, || None);
        self.generation.resize(new, 1);
        self.empty.extend((old..new).rev());
        Some(())
    }

    /// Stores `item`, returning `None` once every addressable slot is taken.
    pub fn insert(&mut self, item: T) -> Option<Handle<T>> {
        if self.empty.is_empty() {
            self.grow()?;
        }
        let empty_slot = self.empty.pop()?;

        self.items[empty_slot] = Some(item);

        Some(Handle::new(empty_slot as u16, self.generation[empty_slot]))
    }

    /// Removes the item and invalidates every outstanding copy of `item`.
    pub fn release(&mut self, item: Handle<T>) -> Option<T> {
        let slot = item.slot as usize;
        if !self.is_live(item) {
            return None;
        }

        let value = self.items[slot].take();
        self.generation[slot] = match self.generation[slot].wrapping_add(1) {
            0 => 1,
            g => g,
        };
        self.empty.push(slot);
        value
    }

    #[inline]
    fn is_live(&self, item: Handle<T>) -> bool {
        let slot = item.slot as usize;
        item.valid()
            && slot < self.items.len()
            && self.generation[slot] == item.generation
            && self.items[slot].is_some()
    }

    pub fn get_ref(&self, item: Handle<T>) -> Option<&T> {
        if !self.is_live(item) {
            return None;
        }
        self.items[item.slot as usize].as_ref()
    }

    pub fn get_mut_ref(&mut self, item: Handle<T>) -> Option<&mut T> {
        if !self.is_live(item) {
            return None;
        }
        self.items[item.slot as usize].as_mut()
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|i| i.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn for_each_occupied<F: FnMut(&T)>(&self, mut func: F) {
        for item in self.items.iter().flatten() {
            func(item);
        }
    }

    pub fn for_each_occupied_mut<F: FnMut(&mut T)>(&mut self, mut func: F) {
        for item in self.items.iter_mut().flatten() {
            func(item);
        }
    }

    /// Handles of every occupied slot, in slot order.
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_some())
            .map(|(slot, _)| Handle::new(slot as u16, self.generation[slot]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_invalid() {
        let h = Handle::<u32>::default();
        assert!(!h.valid());
        let p = Pool::<u32>::new(4);
        assert!(p.get_ref(h).is_none());
    }

    #[test]
    fn release_invalidates_stale_handles() {
        let mut p = Pool::new(2);
        let a = p.insert(10u32).unwrap();
        assert_eq!(p.release(a), Some(10));
        assert!(p.get_ref(a).is_none());
        assert!(p.release(a).is_none());

        let b = p.insert(20u32).unwrap();
        assert_ne!(a, b);
        assert_eq!(p.get_ref(b), Some(&20));
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut p = Pool::new(1);
        let handles: Vec<_> = (0..40u32).map(|i| p.insert(i).unwrap()).collect();
        assert_eq!(p.len(), 40);
        assert_eq!(p.get_ref(handles[39]), Some(&39));
        assert_eq!(p.handles().len(), 40);
    }

    #[test]
    fn handle_is_pod() {
        let h = Handle::<u8>::new(3, 7);
        let bytes = bytemuck::bytes_of(&h);
        assert_eq!(bytes.len(), 4);
        let back: Handle<u8> = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(back, h);
    }
}
