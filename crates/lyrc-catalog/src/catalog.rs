//! The remote catalog

use std::collections::BTreeMap;

use tracing::warn;

use crate::remote::Remote;

/// Read-only mapping from remote name to its definition
///
/// Names iterate in sorted order so listings are stable.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    remotes: BTreeMap<String, Remote>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a remote, replacing an earlier one with the same name
    pub fn insert(&mut self, remote: Remote) {
        if let Some(old) = self.remotes.insert(remote.name.clone(), remote) {
            warn!("Remote '{}' defined more than once, keeping the last", old.name);
        }
    }

    /// Look up a remote
    pub fn get(&self, name: &str) -> Option<&Remote> {
        self.remotes.get(name)
    }

    /// Returns whether the remote exists
    pub fn contains(&self, name: &str) -> bool {
        self.remotes.contains_key(name)
    }

    /// Remote names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.remotes.keys().map(String::as_str)
    }

    /// Iterate over all remotes
    pub fn remotes(&self) -> impl Iterator<Item = &Remote> {
        self.remotes.values()
    }

    /// Number of remotes
    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    /// Returns whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}

impl FromIterator<Remote> for Catalog {
    fn from_iter<I: IntoIterator<Item = Remote>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for remote in iter {
            catalog.insert(remote);
        }
        catalog
    }
}
