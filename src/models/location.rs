//! 导航历史节点
//!
//! Location 组成一条从当前位置指向根节点的单向链表：
//! - 节点创建后不可变，不会被重新挂接（因此不可能成环）
//! - interim 节点在单步后退时会被跳过
//! - 多个 Location 可以共享同一段祖先链

use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Location {
    node: Arc<Node>,
}

struct Node {
    id: Option<CompactString>,
    previous: Option<Location>,
    interim: bool,
}

impl Location {
    pub fn new(id: Option<&str>, previous: Option<Location>, interim: bool) -> Self {
        Self {
            node: Arc::new(Node {
                id: id.map(CompactString::from),
                previous,
                interim,
            }),
        }
    }

    pub fn root(id: &str) -> Self {
        Self::new(Some(id), None, false)
    }

    pub fn id(&self) -> Option<&str> {
        self.node.id.as_deref()
    }

    pub fn previous(&self) -> Option<&Location> {
        self.node.previous.as_ref()
    }

    pub fn is_interim(&self) -> bool {
        self.node.interim
    }

    pub fn is_root(&self) -> bool {
        self.node.previous.is_none()
    }

    /// Same node, not just the same id.
    pub fn ptr_eq(a: &Location, b: &Location) -> bool {
        Arc::ptr_eq(&a.node, &b.node)
    }

    /// Walks from this location (inclusive) to the root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Number of nodes from this location to the root, inclusive.
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// First node on the chain (starting at `self`) whose id is `id`.
    pub fn find(&self, id: &str) -> Option<&Location> {
        self.ancestors().find(|loc| loc.id() == Some(id))
    }

    pub fn root_location(&self) -> &Location {
        let mut cur = self;
        while let Some(prev) = cur.previous() {
            cur = prev;
        }
        cur
    }

    /// First non-interim ancestor, excluding `self`.
    pub fn previous_non_interim(&self) -> Option<&Location> {
        self.ancestors().skip(1).find(|loc| !loc.is_interim())
    }

    /// Ids from this location to the root.
    pub fn ids(&self) -> Vec<Option<&str>> {
        self.ancestors().map(Location::id).collect()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Unlink iteratively so a long history cannot overflow the stack.
        let mut next = self.previous.take();
        while let Some(loc) = next {
            match Arc::try_unwrap(loc.node) {
                Ok(mut node) => next = node.previous.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Location")
            .field("id", &self.id())
            .field("interim", &self.is_interim())
            .field("depth", &self.depth())
            .finish()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for loc in self.ancestors() {
            if !first {
                f.write_str(" <- ")?;
            }
            first = false;
            f.write_str(loc.id().unwrap_or("<none>"))?;
            if loc.is_interim() {
                f.write_str("*")?;
            }
        }
        Ok(())
    }
}

pub struct Ancestors<'a> {
    next: Option<&'a Location>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Location;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = cur.previous();
        Some(cur)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/location.rs"]
mod tests;
