use std::collections::HashSet;
use std::future::Future;

use super::model::{Children, PathTree, TreeNode};
use super::projection::{project, DisplayRow};
use crate::client::protocol::DirItemInfo;
use crate::client::Client;
use crate::error::ClientError;

/// Anything that can list a directory of a named filesystem.
pub trait DirectorySource {
    fn fetch_listing(
        &self,
        path: &str,
        filesystem: &str,
    ) -> impl Future<Output = Result<Vec<DirItemInfo>, ClientError>> + Send;
}

impl DirectorySource for Client {
    fn fetch_listing(
        &self,
        path: &str,
        filesystem: &str,
    ) -> impl Future<Output = Result<Vec<DirItemInfo>, ClientError>> + Send {
        self.list_directory(path, filesystem)
    }
}

/// An outstanding listing request, issued against one generation of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub path: String,
    generation: u64,
}

/// What a toggle resolved to before any I/O happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// The directory was open and is now collapsed.
    Collapsed,
    /// The directory must be listed; hand the ticket back to `finish_expand`.
    Fetch(FetchTicket),
    /// A listing for this path is already in flight.
    Pending,
    /// Files and unknown paths cannot be toggled.
    Ignored,
}

/// Result of a completed toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Collapsed,
    Expanded,
    Pending,
    Ignored,
}

fn children_from(items: Vec<DirItemInfo>) -> Children {
    items
        .into_iter()
        .map(|item| {
            let node = if item.is_file {
                TreeNode::file(item.name)
            } else {
                TreeNode::directory(item.name)
            };
            (item.path, node)
        })
        .collect()
}

/// Owns the path tree and turns expand/collapse intents into listings and
/// tree mutations. The only component allowed to mutate the tree.
#[derive(Debug)]
pub struct DirectoryLoader {
    tree: PathTree,
    filesystem: String,
    pending: HashSet<String>,
    revision: u64,
}

impl DirectoryLoader {
    pub fn new(route: impl Into<String>, filesystem: impl Into<String>) -> Self {
        Self {
            tree: PathTree::new(route),
            filesystem: filesystem.into(),
            pending: HashSet::new(),
            revision: 0,
        }
    }

    /// Discard the tree and start over at `route`. In-flight listings for the
    /// old tree are dropped when they land.
    pub fn reset(&mut self, route: impl Into<String>) {
        self.tree.reset(route);
        self.pending.clear();
        self.revision += 1;
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    pub fn filesystem(&self) -> &str {
        &self.filesystem
    }

    /// Bumped on every mutation; a changed value means a new snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rows(&self) -> Vec<DisplayRow> {
        project(&self.tree)
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.pending.contains(path)
    }

    /// Reserve a listing for `path`, unless one is already in flight or
    /// `path` names a file.
    pub fn begin_expand(&mut self, path: &str) -> Option<FetchTicket> {
        if self.tree.node_at(path).is_some_and(|node| node.is_file) {
            tracing::debug!(path, "files are never listed");
            return None;
        }
        if !self.pending.insert(path.to_string()) {
            tracing::debug!(path, "listing already in flight");
            return None;
        }
        Some(FetchTicket {
            path: path.to_string(),
            generation: self.tree.generation(),
        })
    }

    /// Decide what toggling `path` means right now.
    ///
    /// A loaded directory collapses, even when its listing was empty; anything
    /// else is fetched.
    pub fn begin_toggle(&mut self, path: &str) -> Toggle {
        let loaded = match self.tree.node_at(path) {
            Some(node) if !node.is_file => node.loaded,
            _ => return Toggle::Ignored,
        };
        if loaded {
            self.collapse(path);
            return Toggle::Collapsed;
        }
        match self.begin_expand(path) {
            Some(ticket) => Toggle::Fetch(ticket),
            None => Toggle::Pending,
        }
    }

    /// Fold a completed listing into the tree.
    ///
    /// `Ok(true)` when applied; `Ok(false)` when the ticket is stale or the
    /// path left the tree meanwhile. On `Err` the tree is left untouched and
    /// the error handed back; nothing is retried.
    pub fn finish_expand(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<DirItemInfo>, ClientError>,
    ) -> Result<bool, ClientError> {
        if ticket.generation != self.tree.generation() {
            tracing::debug!(path = %ticket.path, "dropping listing for a previous tree");
            return Ok(false);
        }
        self.pending.remove(&ticket.path);

        let items = match result {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(path = %ticket.path, error = %e, "directory listing failed");
                return Err(e);
            }
        };
        let count = items.len();
        let applied = self.tree.set_children_at(&ticket.path, children_from(items));
        if applied {
            self.revision += 1;
            tracing::debug!(path = %ticket.path, entries = count, "directory expanded");
        } else {
            tracing::debug!(path = %ticket.path, "listed path no longer in tree");
        }
        Ok(applied)
    }

    /// Forget the children of `path`. Local and infallible.
    pub fn collapse(&mut self, path: &str) -> bool {
        let found = self.tree.clear_children_at(path);
        if found {
            self.revision += 1;
        }
        found
    }

    /// List `path` and fold the result into the tree.
    pub async fn expand(
        &mut self,
        source: &impl DirectorySource,
        path: &str,
    ) -> Result<bool, ClientError> {
        let Some(ticket) = self.begin_expand(path) else {
            return Ok(false);
        };
        let result = source.fetch_listing(path, &self.filesystem).await;
        self.finish_expand(ticket, result)
    }

    /// Collapse a loaded directory, expand any other.
    pub async fn toggle(
        &mut self,
        source: &impl DirectorySource,
        path: &str,
    ) -> Result<ToggleOutcome, ClientError> {
        match self.begin_toggle(path) {
            Toggle::Collapsed => Ok(ToggleOutcome::Collapsed),
            Toggle::Pending => Ok(ToggleOutcome::Pending),
            Toggle::Ignored => Ok(ToggleOutcome::Ignored),
            Toggle::Fetch(ticket) => {
                let result = source.fetch_listing(path, &self.filesystem).await;
                self.finish_toggle(ticket, result)
            }
        }
    }

    /// Fold the listing behind a `Toggle::Fetch`. `Ignored` when nothing was
    /// applied.
    pub fn finish_toggle(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<DirItemInfo>, ClientError>,
    ) -> Result<ToggleOutcome, ClientError> {
        if self.finish_expand(ticket, result)? {
            Ok(ToggleOutcome::Expanded)
        } else {
            Ok(ToggleOutcome::Ignored)
        }
    }

    /// List the configured route into the root node.
    pub async fn load_root(&mut self, source: &impl DirectorySource) -> Result<bool, ClientError> {
        let route = self.tree.route().to_string();
        self.expand(source, &route).await
    }
}
