use indexmap::IndexMap;

/// Children of a node, keyed by the path string the Core returned.
///
/// Iteration order is the order entries arrived in the directory listing.
pub type Children = IndexMap<String, TreeNode>;

/// One filesystem entry already known to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub is_file: bool,
    pub children: Children,
    /// Set when a listing landed for this node, cleared on collapse.
    /// Distinguishes a loaded-but-empty directory from one never fetched.
    pub loaded: bool,
}

impl TreeNode {
    /// A file leaf.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_file: true,
            children: Children::new(),
            loaded: false,
        }
    }

    /// A directory whose children have not been fetched yet.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_file: false,
            children: Children::new(),
            loaded: false,
        }
    }
}

/// Whether `c` separates path components. The Core decides the path dialect,
/// so both separators are accepted.
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// True when `path` lies strictly below `ancestor` in the path namespace.
///
/// Component-aware: `/a` contains `/a/b` but not `/ab`.
pub fn is_strict_ancestor(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() || path.len() <= ancestor.len() || !path.starts_with(ancestor) {
        return false;
    }
    if ancestor.ends_with(is_separator) {
        return true;
    }
    path[ancestor.len()..].starts_with(is_separator)
}

/// Drop entries that sit below a sibling of the same listing.
///
/// A listing only describes one level; an entry whose key has another key of
/// the same listing as an ancestor is not a direct child and would otherwise
/// break path uniqueness once that sibling is expanded.
fn direct_children(children: Children) -> Children {
    let nested: Vec<String> = children
        .keys()
        .filter(|key| {
            key.char_indices()
                .filter(|(_, c)| is_separator(*c))
                .any(|(i, c)| {
                    let without = &key[..i];
                    let with = &key[..i + c.len_utf8()];
                    (without != key.as_str() && children.contains_key(without))
                        || (with != key.as_str() && children.contains_key(with))
                })
        })
        .cloned()
        .collect();

    if nested.is_empty() {
        return children;
    }
    children
        .into_iter()
        .filter(|(key, _)| !nested.contains(key))
        .collect()
}

/// Partially loaded tree rooted at the explorer's initial route.
///
/// The root node is synthetic: it always exists, is never a file and is
/// addressed by the route itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTree {
    route: String,
    root: TreeNode,
    generation: u64,
}

impl PathTree {
    /// Create an empty tree holding only the root node for `route`.
    pub fn new(route: impl Into<String>) -> Self {
        let route = route.into();
        Self {
            root: TreeNode::directory(route.clone()),
            route,
            generation: 0,
        }
    }

    /// Discard everything and start over at `route`.
    ///
    /// Bumps the generation so responses issued against the old tree can be
    /// recognised as stale.
    pub fn reset(&mut self, route: impl Into<String>) {
        let generation = self.generation + 1;
        *self = Self::new(route);
        self.generation = generation;
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Incremented on every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the children of the node at `path`.
    ///
    /// Returns `false` and leaves the tree untouched when `path` is not in the
    /// tree or names a file; a response may land after the tree was reset or
    /// collapsed.
    pub fn set_children_at(&mut self, path: &str, children: Children) -> bool {
        match self.node_at_mut(path) {
            Some(node) if node.is_file => false,
            Some(node) => {
                node.children = direct_children(children);
                node.loaded = true;
                true
            }
            None => false,
        }
    }

    /// Forget the children of the node at `path`. The node itself stays.
    pub fn clear_children_at(&mut self, path: &str) -> bool {
        match self.node_at_mut(path) {
            Some(node) => {
                node.children.clear();
                node.loaded = false;
                true
            }
            None => false,
        }
    }

    /// Whether the node at `path` currently has children.
    pub fn is_expanded_at(&self, path: &str) -> bool {
        self.node_at(path)
            .map(|node| !node.children.is_empty())
            .unwrap_or(false)
    }

    /// Whether a listing for `path` landed since its last collapse.
    pub fn is_loaded_at(&self, path: &str) -> bool {
        self.node_at(path).map(|node| node.loaded).unwrap_or(false)
    }

    /// Find the node at `path`, descending only through ancestors of `path`.
    pub fn node_at(&self, path: &str) -> Option<&TreeNode> {
        if path == self.route {
            return Some(&self.root);
        }
        find(&self.root, path)
    }

    fn node_at_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        if path == self.route {
            return Some(&mut self.root);
        }
        find_mut(&mut self.root, path)
    }
}

fn find<'a>(node: &'a TreeNode, path: &str) -> Option<&'a TreeNode> {
    for (key, child) in node.children.iter() {
        if key == path {
            return Some(child);
        }
        if is_strict_ancestor(key, path) {
            return find(child, path);
        }
    }
    None
}

fn find_mut<'a>(node: &'a mut TreeNode, path: &str) -> Option<&'a mut TreeNode> {
    for (key, child) in node.children.iter_mut() {
        if key == path {
            return Some(child);
        }
        if is_strict_ancestor(key, path) {
            return find_mut(child, path);
        }
    }
    None
}
