//! Directory trie for collapsing published paths into invalidations.
//!
//! Paths are split per directory rather than per character, so `/a/b/c`
//! lives under the nodes `/a/` and `/a/b/`. [`DirTrie::collapse`] reduces the
//! published paths to at most `max` entries by replacing crowded subtrees
//! with a `/a/b/*` wildcard, packing the smallest subtrees in first.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not an absolute path")]
pub struct NotPath(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieNode {
    pub path: String,
    pub published: bool,
    /// Children in insertion order.
    pub children: Vec<TrieNode>,
}

impl TrieNode {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            published: false,
            children: Vec::new(),
        }
    }

    fn child(&self, path: &str) -> Option<&TrieNode> {
        self.children.iter().find(|child| child.path == path)
    }

    fn child_mut_or_insert(&mut self, path: &str) -> &mut TrieNode {
        let index = match self.children.iter().position(|child| child.path == path) {
            Some(index) => index,
            None => {
                self.children.push(TrieNode::new(path));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Nodes in this subtree, itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TrieNode::size).sum::<usize>()
    }

    pub fn published_count(&self) -> usize {
        usize::from(self.published)
            + self
                .children
                .iter()
                .map(TrieNode::published_count)
                .sum::<usize>()
    }

    /// Published paths in this subtree, parents before children.
    pub fn published_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_published(&mut paths);
        paths
    }

    fn collect_published(&self, paths: &mut Vec<String>) {
        if self.published {
            paths.push(self.path.clone());
        }
        for child in &self.children {
            child.collect_published(paths);
        }
    }

    fn wildcard(&self) -> Vec<String> {
        vec![format!("{}*", self.path)]
    }

    fn collapse(&self, max: usize) -> Vec<String> {
        let published = self.published_paths();
        if published.len() <= max {
            return published;
        }

        let mut paths = Vec::new();
        if !self.children.is_empty() {
            if self.children.len() > max {
                return self.wildcard();
            }

            let mut children: Vec<&TrieNode> = self.children.iter().collect();
            children.sort_by_key(|child| child.published_count());

            let mut remains = max as isize - children.len() as isize;
            if self.published {
                remains -= 1;
            }
            for child in children {
                let budget = (remains + 1).max(0) as usize;
                let collapsed = child.collapse(budget);
                remains -= collapsed.len() as isize - 1;
                paths.extend(collapsed);
            }
        }

        if self.published {
            paths.push(self.path.clone());
        }

        if paths.len() > max {
            return self.wildcard();
        }
        paths
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTrie {
    root: TrieNode,
}

impl Default for DirTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl DirTrie {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new("/"),
        }
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Mark a path as published, creating its parent directories.
    pub fn insert(&mut self, path: &str) -> Result<(), NotPath> {
        let mut node = &mut self.root;
        for prefix in split_paths(path)? {
            if prefix == "/" {
                continue;
            }
            node = node.child_mut_or_insert(&prefix);
        }
        node.published = true;
        Ok(())
    }

    pub fn find(&self, path: &str) -> Result<Option<&TrieNode>, NotPath> {
        let mut node = &self.root;
        for prefix in split_paths(path)? {
            if prefix == "/" {
                continue;
            }
            match node.child(&prefix) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }

    pub fn published_count(&self) -> usize {
        self.root.published_count()
    }

    pub fn published_paths(&self) -> Vec<String> {
        self.root.published_paths()
    }

    /// At most `max` paths covering everything published. Once `max` drops
    /// below the number of top-level directories the result is `["/*"]`.
    pub fn collapse(&self, max: usize) -> Vec<String> {
        let collapsed = self.root.collapse(max);
        tracing::debug!(
            published = self.published_count(),
            max,
            collapsed = collapsed.len(),
            "Collapsed invalidation paths"
        );
        collapsed
    }
}

impl<'a> FromIterator<&'a str> for DirTrie {
    /// Paths that are not absolute are skipped.
    fn from_iter<I: IntoIterator<Item = &'a str>>(paths: I) -> Self {
        let mut trie = DirTrie::new();
        for path in paths {
            if let Err(err) = trie.insert(path) {
                tracing::warn!("{err}");
            }
        }
        trie
    }
}

/// `/a/b/c` becomes `["/", "/a/", "/a/b/", "/a/b/c"]`; `/a/b/` becomes
/// `["/", "/a/", "/a/b/"]`.
fn split_paths(path: &str) -> Result<Vec<String>, NotPath> {
    if !path.starts_with('/') {
        return Err(NotPath(path.to_string()));
    }

    let mut prefixes = vec!["/".to_string()];
    let mut end = 0;
    while let Some(offset) = path[end + 1..].find('/') {
        end += offset + 1;
        prefixes.push(path[..=end].to_string());
    }
    if !path.ends_with('/') {
        prefixes.push(path.to_string());
    }
    Ok(prefixes)
}
