//! Handle registry
//!
//! Maps opaque handles given to native code onto open files. Slots live in
//! an arena; a handle is its slot index plus a generation, so a handle kept
//! after close never reaches whatever file reuses the slot.

use std::fmt;

/// Opaque handle to a registered file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle {
    index: u32,
    generation: u32,
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot<F> {
    generation: u32,
    file: Option<F>,
}

/// Arena of open files
pub struct FileRegistry<F> {
    slots: Vec<Slot<F>>,
    free: Vec<u32>,
}

impl<F> Default for FileRegistry<F> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<F> FileRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: F) -> FileHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.file = Some(file);
            return FileHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            file: Some(file),
        });
        FileHandle {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, handle: FileHandle) -> Option<&F> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.file.as_ref())
    }

    pub fn get_mut(&mut self, handle: FileHandle) -> Option<&mut F> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.file.as_mut())
    }

    /// Take the file out; the handle is dead afterwards
    pub fn remove(&mut self, handle: FileHandle) -> Option<F> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let file = slot.file.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(file)
    }

    /// Number of live files
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
