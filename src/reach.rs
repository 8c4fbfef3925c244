//! Incremental reachability between the blocks of a circuit

use bit_set::BitSet;

/// Direct and transitive reachability between a fixed number of nodes.
///
/// Each node has three sets: its direct successors, the nodes reachable from it (forward) and
/// the nodes from which it can be reached (backward). Connecting two nodes updates the
/// transitive sets of all affected nodes. Disconnecting only removes the direct edge: the
/// transitive sets are never shrunk and may over-approximate the real reachability.
/// They are only used to reject edges which could close a cycle, so the approximation can
/// forbid some valid edges but never accepts a cycle.
///
/// ```
/// use clbmap::Reachability;
///
/// let mut reach = Reachability::new(3);
/// reach.connect(0, 1);
/// reach.connect(1, 2);
/// assert!(reach.forward(0).contains(2));
/// assert!(reach.backward(2).contains(0));
///
/// reach.disconnect(1, 2);
/// assert!(!reach.is_connected(1, 2));
/// assert!(reach.forward(0).contains(2));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Reachability {
    direct: Vec<BitSet>,
    forward: Vec<BitSet>,
    backward: Vec<BitSet>,
}

impl Reachability {
    pub fn new(size: usize) -> Self {
        Self {
            direct: vec![BitSet::new(); size],
            forward: vec![BitSet::new(); size],
            backward: vec![BitSet::new(); size],
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.direct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty()
    }

    /// Add an edge and extend the transitive sets accordingly
    pub fn connect(&mut self, from: usize, to: usize) {
        self.direct[from].insert(to);

        let mut fwd = self.forward[to].clone();
        fwd.insert(to);
        self.forward[from].union_with(&fwd);

        let mut bwd = self.backward[from].clone();
        bwd.insert(from);
        self.backward[to].union_with(&bwd);

        // Everything reaching "from" now reaches what "from" reaches
        let fwd = self.forward[from].clone();
        let predecessors: Vec<usize> = self.backward[from].iter().collect();
        for node in predecessors {
            self.forward[node].union_with(&fwd);
        }

        let bwd = self.backward[to].clone();
        let successors: Vec<usize> = self.forward[to].iter().collect();
        for node in successors {
            self.backward[node].union_with(&bwd);
        }
    }

    /// Remove a direct edge, the transitive sets are left untouched
    pub fn disconnect(&mut self, from: usize, to: usize) {
        self.direct[from].remove(to);
    }

    pub fn is_connected(&self, from: usize, to: usize) -> bool {
        self.direct[from].contains(to)
    }

    /// Direct successors of a node
    pub fn successors(&self, node: usize) -> &BitSet {
        &self.direct[node]
    }

    /// Nodes which may be reachable from this node
    pub fn forward(&self, node: usize) -> &BitSet {
        &self.forward[node]
    }

    /// Nodes from which this node may be reachable
    pub fn backward(&self, node: usize) -> &BitSet {
        &self.backward[node]
    }
}
