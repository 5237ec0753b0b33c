//! Static 2D KD-tree used for nearest-neighbor lookups over the loaded
//! HRIR coordinates. Built once, queried read-only.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Node {
    point: [f32; 2],
    index: usize,
    axis: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

/// Candidate ordered by descending distance so the heap root is always the
/// current worst match.
struct Candidate {
    dist_sq: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist_sq == other.dist_sq
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq.total_cmp(&other.dist_sq)
    }
}

pub struct KdTree {
    root: Option<Box<Node>>,
    len: usize,
}

impl KdTree {
    /// Builds a tree over the given points; each result index refers back to
    /// the input slice.
    pub fn build(points: &[[f32; 2]]) -> Self {
        let mut entries: Vec<([f32; 2], usize)> =
            points.iter().copied().zip(0..points.len()).collect();
        let len = entries.len();
        let root = Self::build_node(&mut entries, 0);
        Self { root, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn build_node(entries: &mut [([f32; 2], usize)], axis: usize) -> Option<Box<Node>> {
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| a.0[axis].total_cmp(&b.0[axis]));
        let median = entries.len() / 2;
        let (point, index) = entries[median];
        let (before, after) = entries.split_at_mut(median);
        let after = &mut after[1..];
        Some(Box::new(Node {
            point,
            index,
            axis,
            left: Self::build_node(before, (axis + 1) % 2),
            right: Self::build_node(after, (axis + 1) % 2),
        }))
    }

    /// Returns up to `k` nearest points as `(index, distance)`, closest
    /// first.
    pub fn k_nearest(&self, query: [f32; 2], k: usize) -> Vec<(usize, f32)> {
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
        if let Some(root) = &self.root {
            Self::search(root, query, k, &mut heap);
        }
        let mut found: Vec<(usize, f32)> = heap
            .into_iter()
            .map(|c| (c.index, c.dist_sq.sqrt()))
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }

    fn search(node: &Node, query: [f32; 2], k: usize, heap: &mut BinaryHeap<Candidate>) {
        let dx = node.point[0] - query[0];
        let dy = node.point[1] - query[1];
        let dist_sq = dx * dx + dy * dy;

        if heap.len() < k {
            heap.push(Candidate {
                dist_sq,
                index: node.index,
            });
        } else if let Some(worst) = heap.peek() {
            if dist_sq < worst.dist_sq {
                heap.pop();
                heap.push(Candidate {
                    dist_sq,
                    index: node.index,
                });
            }
        }

        let delta = query[node.axis] - node.point[node.axis];
        let (near, far) = if delta < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };

        if let Some(near) = near {
            Self::search(near, query, k, heap);
        }

        // The far side can only matter if the splitting plane is closer than
        // the current worst candidate.
        let plane_dist_sq = delta * delta;
        let must_cross = heap.len() < k
            || heap
                .peek()
                .map(|worst| plane_dist_sq < worst.dist_sq)
                .unwrap_or(true);
        if must_cross {
            if let Some(far) = far {
                Self::search(far, query, k, heap);
            }
        }
    }
}
