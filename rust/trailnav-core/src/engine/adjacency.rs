/// One traversable direction of an edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc {
    pub src: u32,
    pub dst: u32,
    pub edge: u32,
    pub w: f64,
    /// True when travelling source→target along the edge's stored orientation.
    pub forward: bool,
}

/// Compressed sparse rows, neighbours of each node sorted by (dst, weight, edge).
pub struct Adjacency {
    pub nodes: usize,
    pub offsets: Vec<usize>,
    pub dst: Vec<u32>,
    pub edge: Vec<u32>,
    pub w: Vec<f64>,
    pub forward: Vec<bool>,
}

impl Adjacency {
    pub fn build(nodes: usize, arcs: &[Arc]) -> Self {
        let mut counts = vec![0usize; nodes];
        for a in arcs {
            counts[a.src as usize] += 1;
        }
        let mut offsets = vec![0usize; nodes + 1];
        for i in 0..nodes {
            offsets[i + 1] = offsets[i] + counts[i];
        }
        let mut slots: Vec<Arc> = Vec::with_capacity(arcs.len());
        slots.resize(arcs.len(), Arc { src: 0, dst: 0, edge: 0, w: 0.0, forward: true });
        let mut cur = offsets[..nodes].to_vec();
        for a in arcs {
            let s = a.src as usize;
            slots[cur[s]] = *a;
            cur[s] += 1;
        }
        for u in 0..nodes {
            slots[offsets[u]..offsets[u + 1]].sort_unstable_by(|a, b| {
                a.dst.cmp(&b.dst).then(a.w.total_cmp(&b.w)).then(a.edge.cmp(&b.edge)).then(b.forward.cmp(&a.forward))
            });
        }
        Adjacency {
            nodes,
            offsets,
            dst: slots.iter().map(|a| a.dst).collect(),
            edge: slots.iter().map(|a| a.edge).collect(),
            w: slots.iter().map(|a| a.w).collect(),
            forward: slots.iter().map(|a| a.forward).collect(),
        }
    }

    #[inline]
    pub fn range(&self, u: u32) -> std::ops::Range<usize> {
        let u = u as usize;
        self.offsets[u]..self.offsets[u + 1]
    }

    pub fn neighbors(&self, u: u32) -> (&[u32], &[f64]) {
        let r = self.range(u);
        (&self.dst[r.clone()], &self.w[r])
    }

    pub fn arcs(&self) -> usize {
        self.dst.len()
    }
}
