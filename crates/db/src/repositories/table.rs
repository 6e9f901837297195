//! In-memory table backing the repositories.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fedsync_common::{AppError, AppResult};
use tokio::sync::RwLock;

/// A row stored in a [`Table`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Entity name used in error messages.
    const NAME: &'static str;

    /// Local key.
    fn id(&self) -> i64;

    /// Assign the local key.
    fn set_id(&mut self, id: i64);

    /// Unique natural key (the `ap_id` for federated objects).
    fn key(&self) -> String;
}

#[derive(Debug)]
struct Inner<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
    keys: HashMap<String, i64>,
}

/// Rows indexed by local key and natural key.
#[derive(Debug)]
pub struct Table<T> {
    inner: Arc<RwLock<Inner<T>>>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Table<T> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                next_id: 1,
                rows: BTreeMap::new(),
                keys: HashMap::new(),
            })),
        }
    }

    /// Find a row by local key.
    pub async fn find_by_id(&self, id: i64) -> Option<T> {
        self.inner.read().await.rows.get(&id).cloned()
    }

    /// Find a row by local key, returning an error if not found.
    pub async fn get_by_id(&self, id: i64) -> AppResult<T> {
        self.find_by_id(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("{} {id}", T::NAME)))
    }

    /// Find a row by natural key.
    pub async fn find_by_key(&self, key: &str) -> Option<T> {
        let inner = self.inner.read().await;
        inner
            .keys
            .get(key)
            .and_then(|id| inner.rows.get(id))
            .cloned()
    }

    /// Insert a new row and assign its local key.
    pub async fn insert(&self, mut row: T) -> AppResult<T> {
        let mut inner = self.inner.write().await;
        let key = row.key();
        if inner.keys.contains_key(&key) {
            return Err(AppError::Conflict(format!("{} {key} already exists", T::NAME)));
        }
        let id = inner.next_id;
        inner.next_id += 1;
        row.set_id(id);
        inner.keys.insert(key, id);
        inner.rows.insert(id, row.clone());
        Ok(row)
    }

    /// Replace an existing row.
    pub async fn update(&self, row: T) -> AppResult<T> {
        let mut inner = self.inner.write().await;
        let id = row.id();
        let old_key = match inner.rows.get(&id) {
            Some(old) => old.key(),
            None => return Err(AppError::NotFound(format!("{} {id}", T::NAME))),
        };
        let key = row.key();
        if key != old_key {
            if inner.keys.contains_key(&key) {
                return Err(AppError::Conflict(format!("{} {key} already exists", T::NAME)));
            }
            inner.keys.remove(&old_key);
            inner.keys.insert(key, id);
        }
        inner.rows.insert(id, row.clone());
        Ok(row)
    }

    /// Mutate a row in place under the write lock.
    ///
    /// `f` returns whether it changed anything; the updated row is returned
    /// together with that flag.
    pub async fn modify<F>(&self, id: i64, f: F) -> AppResult<(T, bool)>
    where
        F: FnOnce(&mut T) -> bool,
    {
        let mut inner = self.inner.write().await;
        let row = inner
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("{} {id}", T::NAME)))?;
        let changed = f(row);
        Ok((row.clone(), changed))
    }

    /// Mutate the row sharing `row`'s natural key, inserting `row` first when
    /// there is none. Runs under one write lock.
    pub async fn modify_or_insert<F>(&self, mut row: T, f: F) -> (T, bool)
    where
        F: FnOnce(&mut T) -> bool,
    {
        let mut inner = self.inner.write().await;
        let key = row.key();
        let id = if let Some(&id) = inner.keys.get(&key) {
            id
        } else {
            let id = inner.next_id;
            inner.next_id += 1;
            row.set_id(id);
            inner.keys.insert(key, id);
            id
        };
        let stored = inner.rows.entry(id).or_insert(row);
        let changed = f(stored);
        (stored.clone(), changed)
    }

    /// Insert the row, or replace the row with the same natural key.
    pub async fn upsert(&self, mut row: T) -> T {
        let mut inner = self.inner.write().await;
        let key = row.key();
        let id = if let Some(&id) = inner.keys.get(&key) {
            id
        } else {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.keys.insert(key, id);
            id
        };
        row.set_id(id);
        inner.rows.insert(id, row.clone());
        row
    }

    /// Delete a row by natural key.
    pub async fn delete_by_key(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.write().await;
        let id = inner.keys.remove(key)?;
        inner.rows.remove(&id)
    }

    /// All rows matching `filter`, ordered by local key.
    pub async fn list<F>(&self, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.inner
            .read()
            .await
            .rows
            .values()
            .filter(|row| filter(row))
            .cloned()
            .collect()
    }

    /// Number of rows.
    pub async fn count(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        key: String,
        value: u32,
    }

    impl Record for Row {
        const NAME: &'static str = "row";

        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }

        fn key(&self) -> String {
            self.key.clone()
        }
    }

    fn row(key: &str, value: u32) -> Row {
        Row {
            id: 0,
            key: key.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let table = Table::new();
        let a = table.insert(row("a", 1)).await.unwrap();
        let b = table.insert(row("b", 2)).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(table.find_by_key("b").await.unwrap().value, 2);
        assert!(matches!(
            table.insert(row("a", 3)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_modify_and_upsert() {
        let table = Table::new();
        let a = table.insert(row("a", 1)).await.unwrap();

        let (updated, changed) = table
            .modify(a.id, |r| {
                r.value += 1;
                true
            })
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(updated.value, 2);

        let replaced = table.upsert(row("a", 10)).await;
        assert_eq!(replaced.id, a.id);
        assert_eq!(table.count().await, 1);
        assert_eq!(table.get_by_id(a.id).await.unwrap().value, 10);

        assert!(table.delete_by_key("a").await.is_some());
        assert!(table.find_by_id(a.id).await.is_none());
    }

    #[tokio::test]
    async fn test_modify_or_insert() {
        let table = Table::new();

        let (inserted, changed) = table
            .modify_or_insert(row("a", 1), |r| {
                r.value *= 5;
                true
            })
            .await;
        assert!(changed);
        assert_eq!(inserted.value, 5);

        let (existing, changed) = table.modify_or_insert(row("a", 100), |_| false).await;
        assert!(!changed);
        assert_eq!(existing.id, inserted.id);
        assert_eq!(existing.value, 5);
        assert_eq!(table.count().await, 1);
    }
}
