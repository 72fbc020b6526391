use crate::models::{Paper, Workspace};

/// Items addressable by their server id.
pub trait Keyed {
    fn key(&self) -> i64;
}

impl Keyed for Workspace {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Paper {
    fn key(&self) -> i64 {
        self.id
    }
}

/// An item taken out of a list ahead of server confirmation.
#[derive(Debug)]
#[must_use = "a removal must be rolled back if the server call fails"]
pub struct Removed<T> {
    index: usize,
    item: T,
}

impl<T> Removed<T> {
    pub fn item(&self) -> &T {
        &self.item
    }
}

/// A rendered list that applies mutations before the server confirms them.
#[derive(Debug, Clone)]
pub struct OptimisticList<T> {
    items: Vec<T>,
}

impl<T> Default for OptimisticList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> OptimisticList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: i64) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Newest first.
    pub fn insert_front(&mut self, item: T) {
        self.items.insert(0, item);
    }

    pub fn remove(&mut self, key: i64) -> Option<Removed<T>> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        let item = self.items.remove(index);
        Some(Removed { index, item })
    }

    /// Put a removed item back where it was.
    pub fn rollback(&mut self, removed: Removed<T>) {
        let index = removed.index.min(self.items.len());
        self.items.insert(index, removed.item);
    }
}
