//! Category registry
//!
//! Named channels that can be switched on and off independently. Producers
//! may add categories from any thread while the dispatcher reads them.

use dashmap::DashMap;

use crate::constants::DEFAULT_CATEGORY;

/// Map of category name to active flag
#[derive(Debug)]
pub struct CategoryRegistry {
    categories: DashMap<String, bool>,
}

impl CategoryRegistry {
    /// Registry holding only the active default category
    pub fn new() -> Self {
        let categories = DashMap::new();
        categories.insert(DEFAULT_CATEGORY.to_string(), true);
        Self { categories }
    }

    /// Register an active category; no-op if the name is already present
    pub fn add(&self, name: &str) {
        self.categories.entry(name.to_string()).or_insert(true);
    }

    /// Forget a category
    pub fn remove(&self, name: &str) -> bool {
        self.categories.remove(name).is_some()
    }

    pub fn activate(&self, name: &str) {
        self.set_active(name, true);
    }

    pub fn deactivate(&self, name: &str) {
        self.set_active(name, false);
    }

    fn set_active(&self, name: &str, active: bool) {
        if let Some(mut entry) = self.categories.get_mut(name) {
            *entry = active;
        }
    }

    /// Whether events in `name` should be rendered
    ///
    /// Unregistered names count as active so a typo never hides output.
    pub fn is_active(&self, name: &str) -> bool {
        self.categories.get(name).map(|entry| *entry).unwrap_or(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
