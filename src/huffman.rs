//! Huffman coding of the vocabulary, for hierarchical softmax.
//!
//! The tree over `V` words lives in flat arrays of `2V - 1` nodes. Nodes
//! `0..V` are the leaves, in vocabulary order; nodes `V..2V - 1` are internal
//! nodes in the order they were created, so the root is node `2V - 2`.
//! Internal node `n` is numbered `n - V` when it indexes a weight row.

/// Count of an internal node that has not been created yet.
const UNMERGED: u64 = u64::MAX;

#[derive(Debug, Clone, Default)]
pub struct HuffmanTree {
    leaves: usize,
    /// Leaf counts for `0..V`, sums of the two children for `V..2V - 1`.
    count: Vec<u64>,
    /// Parent of each node. The root is its own parent.
    parent: Vec<usize>,
    /// Which child a node is of its parent: 0 for the smaller, 1 for the larger.
    binary: Vec<u8>,
}

/// The two queues the smallest node is drawn from: leaves not yet merged,
/// which run from the rarest word upward, and internal nodes not yet merged,
/// which come out in non-decreasing count order.
struct Queues {
    /// Leaves `0..unmerged_leaves` have no parent yet.
    unmerged_leaves: usize,
    /// Next internal node to merge, in creation order.
    next_internal: usize,
}

impl Queues {
    /// Pop the node with the smaller count. On a tie the internal node wins.
    fn pop(&mut self, count: &[u64]) -> usize {
        match self.unmerged_leaves.checked_sub(1) {
            Some(leaf) if count[leaf] < count[self.next_internal] => {
                self.unmerged_leaves = leaf;
                leaf
            }
            _ => {
                self.next_internal += 1;
                self.next_internal - 1
            }
        }
    }
}

impl HuffmanTree {
    /// Build the tree for leaf counts sorted in non-increasing order.
    ///
    /// Because the leaves are sorted and merged nodes come out in
    /// non-decreasing count order, the two smallest candidates are always at
    /// the front of one of two queues, so this runs in O(V) with no heap.
    pub fn build(counts: &[u64]) -> Self {
        debug_assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        let vocab_size = counts.len();
        if vocab_size == 0 {
            return HuffmanTree::default();
        }

        let num_nodes = vocab_size * 2 - 1;
        let mut count = vec![UNMERGED; num_nodes];
        count[..vocab_size].copy_from_slice(counts);
        let mut binary = vec![0u8; num_nodes];
        let mut parent = vec![num_nodes - 1; num_nodes];

        let mut queues = Queues {
            unmerged_leaves: vocab_size,
            next_internal: vocab_size,
        };
        for node in vocab_size..num_nodes {
            let smaller = queues.pop(&count);
            let larger = queues.pop(&count);
            count[node] = count[smaller] + count[larger];
            parent[smaller] = node;
            parent[larger] = node;
            binary[larger] = 1;
        }

        HuffmanTree {
            leaves: vocab_size,
            count,
            parent,
            binary,
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves
    }

    /// Total number of nodes, `2V - 1` (or 0 for an empty tree).
    pub fn num_nodes(&self) -> usize {
        self.count.len()
    }

    pub fn num_internal_nodes(&self) -> usize {
        self.leaves.saturating_sub(1)
    }

    pub fn root(&self) -> Option<usize> {
        self.count.len().checked_sub(1)
    }

    pub fn count(&self, node: usize) -> u64 {
        self.count[node]
    }

    /// Returns the parent of `node`, or `None` for the root.
    pub fn parent(&self, node: usize) -> Option<usize> {
        let parent = self.parent[node];
        (parent != node).then_some(parent)
    }

    /// The Huffman bit on the edge from `node`'s parent down to `node`.
    pub fn bit(&self, node: usize) -> u8 {
        self.binary[node]
    }

    /// Returns `(code, path)` for `leaf`, both running from the root down.
    ///
    /// `code[d]` is the decision taken at internal node `path[d]`; path
    /// entries are internal-node numbers (node index minus `V`), so `path[0]`
    /// is always the root, `V - 2`. A lone leaf has an empty code.
    pub fn code_and_path(&self, leaf: usize) -> (Vec<u8>, Vec<u32>) {
        assert!(leaf < self.leaves, "{leaf} is not a leaf");
        let mut code = Vec::new();
        let mut path = Vec::new();
        let mut node = leaf;
        while let Some(parent) = self.parent(node) {
            code.push(self.binary[node]);
            path.push((parent - self.leaves) as u32);
            node = parent;
        }
        code.reverse();
        path.reverse();
        (code, path)
    }
}
