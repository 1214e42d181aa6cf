use std::any::Any;
use std::rc::Weak;

use rustc_hash::FxHashMap;
use slab::Slab;

use crate::dependent::{Dependent, Identity};
use crate::signature::{Signature, SignatureMap};

/// A tree of layered lookup tables that associates a value with a sequence
/// of dependents and an argument signature.
///
/// Every step from a layer to its child is keyed by the identity of one
/// dependent. Edges only hold weak anchors, so the tree never keeps a
/// dependent alive. Once a dependent is gone, its edge is dead and the whole
/// subtree below it is dropped by a later sweep of its parent layer.
///
/// A layer is swept when it is about to grow past a threshold, which is then
/// reset to twice the number of live edges. Growing stays amortized constant
/// and dead edges never outnumber live ones by more than that factor.
///
/// Values must not hold strong references to their own dependents. Such a
/// dependent stays alive through the tree and its edge is never swept.
pub struct CacheTree<T> {
    /// All layers, root included.
    layers: Slab<Layer<T>>,
    /// The layer every walk starts at.
    root: LayerId,
}

/// Identifies a layer in the tree.
type LayerId = usize;

/// The smallest number of edges a layer may hold before it is swept.
const MIN_SWEEP_AT: usize = 8;

/// One level of the tree.
struct Layer<T> {
    /// Transitions to deeper layers, keyed by dependent identity.
    edges: FxHashMap<Identity, Edge>,
    /// Results memoized for walks that end at this layer.
    results: SignatureMap<T>,
    /// Sweep before growing once the edges reach this count.
    sweep_at: usize,
}

/// A transition from a layer to its child.
struct Edge {
    /// Keeps the dependent's address reserved without keeping it alive.
    anchor: Weak<dyn Any>,
    /// The layer to transition to.
    child: LayerId,
}

impl Edge {
    /// Whether the dependent this edge is keyed by still exists.
    fn is_alive(&self) -> bool {
        self.anchor.strong_count() > 0
    }
}

impl<T> Layer<T> {
    fn new() -> Self {
        Self {
            edges: FxHashMap::default(),
            results: SignatureMap::default(),
            sweep_at: MIN_SWEEP_AT,
        }
    }
}

impl<T> CacheTree<T> {
    /// Creates a tree with only an empty root layer.
    pub fn new() -> Self {
        let mut layers = Slab::new();
        let root = layers.insert(Layer::new());
        Self { layers, root }
    }

    /// Retrieves the value stored for the dependents and signature.
    ///
    /// Layers that are missing along the path are created on the way.
    pub fn get<'a>(
        &mut self,
        sequence: impl IntoIterator<Item = &'a Dependent>,
        signature: &Signature,
    ) -> Option<&T> {
        let id = self.walk(sequence);
        self.layers[id].results.get(signature)
    }

    /// Stores a value for the dependents and signature and returns the stored
    /// value.
    ///
    /// If a value is already present, for example because the computation
    /// re-entered the same selector with the same inputs, it is kept and the
    /// new one is discarded.
    pub fn insert<'a>(
        &mut self,
        sequence: impl IntoIterator<Item = &'a Dependent>,
        signature: Signature,
        value: T,
    ) -> &T {
        let id = self.walk(sequence);
        self.layers[id].results.entry(signature).or_insert(value)
    }

    /// The number of values currently stored.
    pub fn len(&self) -> usize {
        self.layers.iter().map(|(_, layer)| layer.results.len()).sum()
    }

    /// The number of layers, root included.
    #[cfg(test)]
    pub fn layers(&self) -> usize {
        self.layers.len()
    }

    /// Follows the dependents from the root, building missing layers.
    fn walk<'a>(&mut self, sequence: impl IntoIterator<Item = &'a Dependent>) -> LayerId {
        let mut cursor = self.root;
        for dependent in sequence {
            let identity = dependent.identity();
            let next = self.layers[cursor].edges.get(&identity).map(|edge| edge.child);
            cursor = match next {
                Some(child) => child,
                None => {
                    let layer = &self.layers[cursor];
                    if layer.edges.len() >= layer.sweep_at {
                        self.sweep(cursor);
                    }
                    let child = self.layers.insert(Layer::new());
                    let edge = Edge { anchor: dependent.downgrade(), child };
                    self.layers[cursor].edges.insert(identity, edge);
                    child
                }
            };
        }
        cursor
    }

    /// Removes the dead edges of a layer together with their subtrees.
    fn sweep(&mut self, id: LayerId) {
        let mut dead = vec![];
        self.layers[id].edges.retain(|_, edge| {
            let alive = edge.is_alive();
            if !alive {
                dead.push(edge.child);
            }
            alive
        });

        let layer = &mut self.layers[id];
        layer.sweep_at = (2 * layer.edges.len()).max(MIN_SWEEP_AT);

        while let Some(child) = dead.pop() {
            let layer = self.layers.remove(child);
            dead.extend(layer.edges.into_values().map(|edge| edge.child));
        }
    }
}

impl<T> Default for CacheTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
