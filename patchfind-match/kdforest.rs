use std::cmp::Ordering;
use std::collections::BinaryHeap;

use patchfind_core::Descriptors;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::distance::{squared_distance_bounded, Nearest2};

/// Split dimension is drawn among this many highest-variance dimensions
const RAND_DIMS: usize = 5;
/// Points used to estimate per-dimension mean and variance at each node
const SAMPLE_MEAN: usize = 100;

#[derive(Debug, Clone)]
enum Node {
    Leaf(Vec<usize>),
    Split {
        dim: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
    root: usize,
}

/// Pending branch in the best-bin-first queue, ordered by lower bound
#[derive(Debug, Clone, Copy)]
struct Branch {
    tree: usize,
    node: usize,
    bound: f32,
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound
    }
}

impl Eq for Branch {}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Branch {
    // reversed so the max-heap pops the closest branch first
    fn cmp(&self, other: &Self) -> Ordering {
        other.bound.total_cmp(&self.bound)
    }
}

/// Per-query marks for points already compared, cleared point by point
#[derive(Debug, Clone, Default)]
pub struct Visited {
    marks: Vec<bool>,
    touched: Vec<usize>,
}

impl Visited {
    fn reset(&mut self, n: usize) {
        if self.marks.len() != n {
            self.marks.clear();
            self.marks.resize(n, false);
        } else {
            for &p in &self.touched {
                self.marks[p] = false;
            }
        }
        self.touched.clear();
    }

    /// `true` the first time `p` is marked since the last reset
    fn mark(&mut self, p: usize) -> bool {
        if self.marks[p] {
            return false;
        }
        self.marks[p] = true;
        self.touched.push(p);
        true
    }
}

/// Randomised k-d trees over one descriptor table, searched together
/// through a single priority queue.
pub struct KdForest<'a> {
    data: &'a Descriptors,
    trees: Vec<Tree>,
}

impl<'a> KdForest<'a> {
    pub fn build(data: &'a Descriptors, n_trees: usize, seed: u64) -> Self {
        let trees = (0..n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let mut indices: Vec<usize> = (0..data.len()).collect();
                indices.shuffle(&mut rng);
                let mut nodes = Vec::new();
                let root = divide(data, &mut indices, &mut nodes, &mut rng);
                Tree { nodes, root }
            })
            .collect();
        Self { data, trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Approximate two nearest neighbours of `query`.
    ///
    /// Every tree is descended once; further branches are then explored in
    /// order of their distance bound until `checks` points were compared.
    pub fn nearest_two(&self, query: &[f32], checks: usize) -> Nearest2 {
        self.nearest_two_with(query, checks, &mut Visited::default())
    }

    /// Same as [`nearest_two`](Self::nearest_two), reusing `visited` between
    /// queries so a worker allocates its marks only once.
    pub fn nearest_two_with(&self, query: &[f32], checks: usize, visited: &mut Visited) -> Nearest2 {
        visited.reset(self.data.len());
        let mut best = Nearest2::default();
        let mut heap = BinaryHeap::new();
        let mut checked = 0usize;

        for (t, tree) in self.trees.iter().enumerate() {
            self.descend(t, tree.root, 0.0, query, &mut heap, &mut best, visited, &mut checked, checks);
        }

        while let Some(branch) = heap.pop() {
            if checked >= checks && best.is_full() {
                break;
            }
            if branch.bound >= best.worst() {
                continue;
            }
            self.descend(
                branch.tree,
                branch.node,
                branch.bound,
                query,
                &mut heap,
                &mut best,
                visited,
                &mut checked,
                checks,
            );
        }

        best
    }

    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        tree: usize,
        mut node: usize,
        bound: f32,
        query: &[f32],
        heap: &mut BinaryHeap<Branch>,
        best: &mut Nearest2,
        visited: &mut Visited,
        checked: &mut usize,
        checks: usize,
    ) {
        let nodes = &self.trees[tree].nodes;
        loop {
            match &nodes[node] {
                Node::Leaf(points) => {
                    if *checked >= checks && best.is_full() {
                        return;
                    }
                    for &p in points {
                        if !visited.mark(p) {
                            continue;
                        }
                        *checked += 1;
                        let d = squared_distance_bounded(query, self.data.row(p), best.worst());
                        best.offer(p, d);
                    }
                    return;
                }
                Node::Split { dim, value, left, right } => {
                    let diff = query[*dim] - value;
                    let (near, far) = if diff < 0.0 { (*left, *right) } else { (*right, *left) };
                    let far_bound = bound + diff * diff;
                    if far_bound < best.worst() {
                        heap.push(Branch {
                            tree,
                            node: far,
                            bound: far_bound,
                        });
                    }
                    node = near;
                }
            }
        }
    }
}

fn divide(data: &Descriptors, indices: &mut [usize], nodes: &mut Vec<Node>, rng: &mut StdRng) -> usize {
    if indices.len() <= 1 {
        nodes.push(Node::Leaf(indices.to_vec()));
        return nodes.len() - 1;
    }

    let (dim, value) = choose_split(data, indices, rng);
    let split = partition(indices, |i| data.row(i)[dim] < value);
    if split == 0 || split == indices.len() {
        // every point shares the split coordinate
        nodes.push(Node::Leaf(indices.to_vec()));
        return nodes.len() - 1;
    }

    let (lo, hi) = indices.split_at_mut(split);
    let left = divide(data, lo, nodes, rng);
    let right = divide(data, hi, nodes, rng);
    nodes.push(Node::Split { dim, value, left, right });
    nodes.len() - 1
}

fn choose_split(data: &Descriptors, indices: &[usize], rng: &mut StdRng) -> (usize, f32) {
    let dim = data.dim();
    let sample = &indices[..indices.len().min(SAMPLE_MEAN)];
    let n = sample.len() as f32;

    let mut mean = vec![0f32; dim];
    for &i in sample {
        for (m, v) in mean.iter_mut().zip(data.row(i)) {
            *m += v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut var = vec![0f32; dim];
    for &i in sample {
        for ((s, v), m) in var.iter_mut().zip(data.row(i)).zip(&mean) {
            *s += (v - m) * (v - m);
        }
    }

    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| var[b].total_cmp(&var[a]));
    let top = RAND_DIMS.min(dim);
    let pick = order[rng.random_range(0..top)];
    (pick, mean[pick])
}

/// In-place partition; returns the count of elements satisfying `pred`
fn partition(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut next = 0;
    for k in 0..indices.len() {
        if pred(indices[k]) {
            indices.swap(next, k);
            next += 1;
        }
    }
    next
}
