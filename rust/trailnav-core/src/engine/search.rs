use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use aligned_vec::AVec;
use bitvec::vec::BitVec;

use crate::error::{NavError, NavResult};
use crate::snapshot::GraphSnapshot;

/// Pops between two looks at the cancellation flag.
const CANCEL_CHECK_INTERVAL: u32 = 1024;

thread_local! {
    static SEARCH_CONTEXT: RefCell<SearchContext> = RefCell::new(SearchContext::new(0));
}

/// Added to a used edge's weight before scaling, so zero-cost edges are penalised too.
pub const PENALTY_FLOOR: f64 = 1.0;

/// Weighs already-used edges as `(w + PENALTY_FLOOR) * factor`; drives
/// alternative discovery.
pub struct EdgePenalty {
    pub used: BitVec,
    pub factor: f64,
}

impl EdgePenalty {
    pub fn new(edges: usize, factor: f64) -> Self {
        Self { used: BitVec::repeat(false, edges), factor }
    }

    pub fn mark(&mut self, edge: u32) {
        self.used.set(edge as usize, true);
    }

    #[inline]
    fn apply(&self, edge: u32, w: f64) -> f64 {
        if self.used[edge as usize] {
            (w + PENALTY_FLOOR) * self.factor
        } else {
            w
        }
    }
}

pub struct SearchParams<'a> {
    pub source: u32,
    pub target: u32,
    pub directed: bool,
    pub cancel: Option<&'a AtomicBool>,
    pub penalty: Option<&'a EdgePenalty>,
}

impl<'a> SearchParams<'a> {
    pub fn new(source: u32, target: u32) -> Self {
        Self { source, target, directed: false, cancel: None, penalty: None }
    }

    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    pub fn cancel(mut self, flag: Option<&'a AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }
}

/// One edge traversal on a path. `forward` is false when the edge was walked
/// target→source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathHop {
    pub edge: u32,
    pub from: u32,
    pub to: u32,
    pub forward: bool,
    pub cost: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    pub source: u32,
    pub target: u32,
    pub hops: Vec<PathHop>,
    /// Sum of hop costs, penalties excluded.
    pub cost: f64,
    pub settled: u64,
}

impl PathResult {
    pub fn nodes(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.hops.len() + 1);
        out.push(self.source);
        out.extend(self.hops.iter().map(|h| h.to));
        out
    }

    pub fn edges(&self) -> Vec<u32> {
        self.hops.iter().map(|h| h.edge).collect()
    }

    pub fn is_trivial(&self) -> bool {
        self.hops.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
struct QueueEntry {
    cost: f64,
    seq: u64,
    node: u32,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed: BinaryHeap is a max-heap. Equal costs pop in push order.
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct SearchContext {
    pub dist: AVec<f64>,
    pub parent_arc: AVec<u32>,
    pub settled: AVec<bool>,
    pub visited_gen: AVec<u32>,
    pub generation: u32,
    open: BinaryHeap<QueueEntry>,
    seq: u64,
}

impl SearchContext {
    pub fn new(nodes: usize) -> Self {
        Self {
            dist: AVec::__from_elem(64, f64::INFINITY, nodes),
            parent_arc: AVec::__from_elem(64, u32::MAX, nodes),
            settled: AVec::__from_elem(64, false, nodes),
            visited_gen: AVec::__from_elem(64, 0, nodes),
            generation: 1,
            open: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub fn reset(&mut self, nodes: usize) {
        if self.dist.len() != nodes {
            *self = Self::new(nodes);
        } else {
            self.generation = self.generation.wrapping_add(1);
            if self.generation == 0 {
                self.visited_gen.fill(0);
                self.generation = 1;
            }
            self.open.clear();
            self.seq = 0;
        }
    }

    #[inline(always)]
    pub fn get_dist(&self, u: usize) -> f64 {
        if self.visited_gen[u] == self.generation {
            self.dist[u]
        } else {
            f64::INFINITY
        }
    }

    #[inline(always)]
    fn touch(&mut self, u: usize) {
        if self.visited_gen[u] != self.generation {
            self.visited_gen[u] = self.generation;
            self.settled[u] = false;
            self.parent_arc[u] = u32::MAX;
        }
    }

    #[inline(always)]
    pub fn is_settled(&self, u: usize) -> bool {
        self.visited_gen[u] == self.generation && self.settled[u]
    }

    #[inline(always)]
    pub fn get_parent_arc(&self, u: usize) -> u32 {
        if self.visited_gen[u] == self.generation {
            self.parent_arc[u]
        } else {
            u32::MAX
        }
    }

    fn push(&mut self, cost: f64, node: u32) {
        self.seq += 1;
        self.open.push(QueueEntry { cost, seq: self.seq, node });
    }
}

/// Label-setting search over a snapshot's adjacency.
pub struct Dijkstra<'a> {
    snapshot: &'a GraphSnapshot,
}

impl<'a> Dijkstra<'a> {
    pub fn new(snapshot: &'a GraphSnapshot) -> Self {
        Self { snapshot }
    }

    /// `Ok(None)` when the target cannot be reached.
    pub fn run(&self, params: &SearchParams<'_>, ctx: &mut SearchContext) -> NavResult<Option<PathResult>> {
        let n = self.snapshot.nodes().len();
        if params.source as usize >= n || params.target as usize >= n {
            return Err(NavError::invalid("search endpoint outside the graph"));
        }
        let adj = self.snapshot.adjacency(params.directed);
        ctx.reset(n);
        let source = params.source as usize;
        ctx.touch(source);
        ctx.dist[source] = 0.0;
        ctx.push(0.0, params.source);

        let mut pops: u32 = 0;
        let mut settled: u64 = 0;
        let mut reached = false;
        while let Some(QueueEntry { cost, node, .. }) = ctx.open.pop() {
            pops = pops.wrapping_add(1);
            if pops % CANCEL_CHECK_INTERVAL == 0 {
                if let Some(flag) = params.cancel {
                    if flag.load(AtomicOrdering::Relaxed) {
                        return Err(NavError::Cancelled);
                    }
                }
            }
            let u = node as usize;
            if ctx.is_settled(u) || cost > ctx.get_dist(u) {
                continue;
            }
            ctx.settled[u] = true;
            settled += 1;
            if node == params.target {
                reached = true;
                break;
            }
            for a in adj.range(node) {
                let v = adj.dst[a] as usize;
                if ctx.is_settled(v) {
                    continue;
                }
                let w = match params.penalty {
                    Some(p) => p.apply(adj.edge[a], adj.w[a]),
                    None => adj.w[a],
                };
                let nd = cost + w;
                if nd < ctx.get_dist(v) {
                    ctx.touch(v);
                    ctx.dist[v] = nd;
                    ctx.parent_arc[v] = a as u32;
                    ctx.push(nd, adj.dst[a]);
                }
            }
        }
        if !reached {
            return Ok(None);
        }

        let mut hops = Vec::new();
        let mut cur = params.target;
        while cur != params.source {
            let a = ctx.get_parent_arc(cur as usize);
            if a == u32::MAX {
                return Err(NavError::integrity("broken predecessor chain"));
            }
            let a = a as usize;
            let edge = adj.edge[a];
            let (s, t) = self.snapshot.edge_ends(edge);
            let forward = adj.forward[a];
            let from = if forward { s } else { t };
            hops.push(PathHop { edge, from, to: cur, forward, cost: adj.w[a] });
            cur = from;
        }
        hops.reverse();
        let cost = hops.iter().fold(0.0, |acc, h| acc + h.cost);
        Ok(Some(PathResult { source: params.source, target: params.target, hops, cost, settled }))
    }
}

/// Runs `f` with this thread's reusable search context.
pub fn with_search_context<R>(f: impl FnOnce(&mut SearchContext) -> R) -> R {
    SEARCH_CONTEXT.with(|cell| f(&mut cell.borrow_mut()))
}

/// Cheapest path from `params.source` to `params.target`, or `NoPath`.
pub fn shortest_path(snapshot: &GraphSnapshot, params: &SearchParams<'_>) -> NavResult<PathResult> {
    let found = with_search_context(|ctx| Dijkstra::new(snapshot).run(params, ctx))?;
    found.ok_or_else(|| NavError::NoPath {
        from: snapshot.node(params.source).id,
        to: snapshot.node(params.target).id,
    })
}
