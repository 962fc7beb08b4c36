use std::{collections::HashSet, iter::FusedIterator};

use procvmi_core::{Va, VmiRead};

use crate::{ArchAdapter, WindowsRegion, WindowsState};

/// Upper bound on the nodes visited in one VAD tree walk.
const MAX_VAD_NODES: usize = 1 << 20;

/// A preorder iterator over the nodes of a VAD tree.
///
/// Visits a node, then its left subtree, then its right subtree, and yields
/// only regions whose bounds are plausible (see
/// [`WindowsRegion::is_plausible`]).
///
/// The walk is best-effort. A node whose bounds cannot be read is dropped
/// together with its subtree. If its left link cannot be read, both
/// children are dropped; if only the right link fails, the right subtree is
/// dropped. Each node is visited at most once, so a tree that links back
/// into itself still terminates, as does the walk as a whole after a fixed
/// number of nodes.
pub struct VadTreeIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    vmi: WindowsState<'a, Driver>,
    stack: Vec<Va>,
    visited: HashSet<Va>,
    remaining: usize,
}

impl<'a, Driver> VadTreeIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    /// Creates a new VAD tree iterator rooted at the node at `root`.
    pub fn new(vmi: WindowsState<'a, Driver>, root: Va) -> Self {
        let stack = if root.is_null() { Vec::new() } else { vec![root] };

        Self {
            vmi,
            stack,
            visited: HashSet::new(),
            remaining: MAX_VAD_NODES,
        }
    }

    /// Creates an iterator over an empty tree.
    pub fn empty(vmi: WindowsState<'a, Driver>) -> Self {
        Self::new(vmi, Va(0))
    }

    /// Expands a node: schedules its children and reports whether the node
    /// itself is yielded.
    fn visit(&mut self, region: &WindowsRegion<'a, Driver>) -> bool {
        let node = region.va();

        let plausible = match region.is_plausible() {
            Ok(plausible) => plausible,
            Err(err) => {
                tracing::trace!(%node, %err, "failed to read VAD bounds");
                return false;
            }
        };

        let left = match region.left() {
            Ok(left) => left,
            Err(err) => {
                tracing::trace!(%node, %err, "failed to read VAD left child");
                return plausible;
            }
        };

        match region.right() {
            Ok(Some(right)) => self.stack.push(right.va()),
            Ok(None) => {}
            Err(err) => tracing::trace!(%node, %err, "failed to read VAD right child"),
        }

        if let Some(left) = left {
            self.stack.push(left.va());
        }

        plausible
    }
}

impl<'a, Driver> Iterator for VadTreeIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    type Item = WindowsRegion<'a, Driver>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if !self.visited.insert(node) {
                tracing::debug!(%node, "VAD node reached twice");
                continue;
            }

            if self.remaining == 0 {
                tracing::warn!(%node, "VAD walk exceeded maximum node count");
                self.stack.clear();
                return None;
            }
            self.remaining -= 1;

            let region = WindowsRegion::new(self.vmi, node);
            if self.visit(&region) {
                return Some(region);
            }
        }

        None
    }
}

impl<Driver> FusedIterator for VadTreeIterator<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
}
