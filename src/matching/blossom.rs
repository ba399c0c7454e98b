//! Maximum-weight general graph matching.
//!
//! Edmonds' blossom algorithm with dual variables, O(n^3). The search
//! grows alternating trees from every exposed vertex, shrinks odd cycles
//! into blossoms and adjusts duals until it either augments the matching
//! or proves optimality.
//!
//! With `max_cardinality` set, only maximum-cardinality matchings are
//! considered, and the result is the heaviest among them. Weights are
//! integers; every computation stays in integer arithmetic.

/// Sentinel for "no vertex / no edge endpoint"
const NONE: usize = usize::MAX;

/// An undirected weighted edge `(u, v, weight)`
pub type WeightedEdge = (usize, usize, i64);

/// Compute a maximum-weight matching.
///
/// # Arguments
/// * `vertex_count` - Number of vertices; edges may only reference `0..vertex_count`
/// * `edges` - Undirected edges, at most one per vertex pair, no self-loops
/// * `max_cardinality` - Restrict the search to maximum-cardinality matchings
///
/// # Returns
/// The mate of every vertex, `None` when the vertex is left unmatched.
pub fn max_weight_matching(vertex_count: usize, edges: &[WeightedEdge], max_cardinality: bool) -> Vec<Option<usize>> {
    let nvertex = edges
        .iter()
        .map(|&(u, v, _)| u.max(v) + 1)
        .max()
        .unwrap_or(0)
        .max(vertex_count);
    if edges.is_empty() {
        return vec![None; nvertex];
    }
    Matcher::new(nvertex, edges, max_cardinality).solve()
}

/// Total weight of the edges selected by `mates`.
pub fn matching_weight(edges: &[WeightedEdge], mates: &[Option<usize>]) -> i64 {
    edges
        .iter()
        .filter(|&&(u, v, _)| mates[u] == Some(v))
        .map(|&(_, _, w)| w)
        .sum()
}

struct Matcher<'a> {
    edges: &'a [WeightedEdge],
    nvertex: usize,
    max_cardinality: bool,
    /// Vertex at each edge endpoint: endpoint[2k] = edges[k].0, endpoint[2k+1] = edges[k].1
    endpoint: Vec<usize>,
    /// Remote endpoints of the edges incident to every vertex
    neighbend: Vec<Vec<usize>>,
    /// Remote endpoint of the matched edge of every vertex
    mate: Vec<usize>,
    /// 0 = free, 1 = S (outer), 2 = T (inner), 5 = S marked during a scan
    label: Vec<u8>,
    labelend: Vec<usize>,
    inblossom: Vec<usize>,
    blossomparent: Vec<usize>,
    blossomchilds: Vec<Vec<usize>>,
    blossombase: Vec<usize>,
    blossomendps: Vec<Vec<usize>>,
    bestedge: Vec<usize>,
    blossombestedges: Vec<Option<Vec<usize>>>,
    unusedblossoms: Vec<usize>,
    dualvar: Vec<i64>,
    allowedge: Vec<bool>,
    queue: Vec<usize>,
}

/// Index a cyclic list with a possibly negative position.
fn cyclic(len: usize, idx: isize) -> usize {
    idx.rem_euclid(len as isize) as usize
}

impl<'a> Matcher<'a> {
    fn new(nvertex: usize, edges: &'a [WeightedEdge], max_cardinality: bool) -> Self {
        let maxweight = edges.iter().map(|e| e.2).max().unwrap_or(0).max(0);

        let mut endpoint = Vec::with_capacity(2 * edges.len());
        let mut neighbend = vec![Vec::new(); nvertex];
        for (k, &(i, j, _)) in edges.iter().enumerate() {
            endpoint.push(i);
            endpoint.push(j);
            neighbend[i].push(2 * k + 1);
            neighbend[j].push(2 * k);
        }

        Self {
            edges,
            nvertex,
            max_cardinality,
            endpoint,
            neighbend,
            mate: vec![NONE; nvertex],
            label: vec![0; 2 * nvertex],
            labelend: vec![NONE; 2 * nvertex],
            inblossom: (0..nvertex).collect(),
            blossomparent: vec![NONE; 2 * nvertex],
            blossomchilds: vec![Vec::new(); 2 * nvertex],
            blossombase: (0..nvertex).chain(std::iter::repeat(NONE).take(nvertex)).collect(),
            blossomendps: vec![Vec::new(); 2 * nvertex],
            bestedge: vec![NONE; 2 * nvertex],
            blossombestedges: vec![None; 2 * nvertex],
            unusedblossoms: (nvertex..2 * nvertex).collect(),
            dualvar: std::iter::repeat(maxweight)
                .take(nvertex)
                .chain(std::iter::repeat(0).take(nvertex))
                .collect(),
            allowedge: vec![false; edges.len()],
            queue: Vec::new(),
        }
    }

    fn slack(&self, k: usize) -> i64 {
        let (i, j, w) = self.edges[k];
        self.dualvar[i] + self.dualvar[j] - 2 * w
    }

    fn collect_leaves(&self, b: usize, out: &mut Vec<usize>) {
        if b < self.nvertex {
            out.push(b);
        } else {
            for &t in &self.blossomchilds[b] {
                self.collect_leaves(t, out);
            }
        }
    }

    fn leaves(&self, b: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(b, &mut out);
        out
    }

    /// Label the top-level blossom of `w` with `t`, reached through endpoint `p`.
    fn assign_label(&mut self, w: usize, t: u8, p: usize) {
        let b = self.inblossom[w];
        self.label[w] = t;
        self.label[b] = t;
        self.labelend[w] = p;
        self.labelend[b] = p;
        self.bestedge[w] = NONE;
        self.bestedge[b] = NONE;
        if t == 1 {
            let leaves = self.leaves(b);
            self.queue.extend(leaves);
        } else if t == 2 {
            let base = self.blossombase[b];
            let mb = self.mate[base];
            self.assign_label(self.endpoint[mb], 1, mb ^ 1);
        }
    }

    /// Trace back from `v` and `w` to find a new blossom base, or `NONE`
    /// when the two paths reach different roots (augmenting path).
    fn scan_blossom(&mut self, mut v: usize, mut w: usize) -> usize {
        let mut path = Vec::new();
        let mut base = NONE;
        while v != NONE || w != NONE {
            let mut b = self.inblossom[v];
            if self.label[b] & 4 != 0 {
                base = self.blossombase[b];
                break;
            }
            path.push(b);
            self.label[b] = 5;
            if self.labelend[b] == NONE {
                v = NONE;
            } else {
                v = self.endpoint[self.labelend[b]];
                b = self.inblossom[v];
                v = self.endpoint[self.labelend[b]];
            }
            if w != NONE {
                std::mem::swap(&mut v, &mut w);
            }
        }
        for b in path {
            self.label[b] = 1;
        }
        base
    }

    /// Shrink the odd cycle closed by edge `k` into a new blossom.
    fn add_blossom(&mut self, base: usize, k: usize) {
        let (mut v, mut w, _) = self.edges[k];
        let bb = self.inblossom[base];
        let mut bv = self.inblossom[v];
        let mut bw = self.inblossom[w];
        let b = self
            .unusedblossoms
            .pop()
            .expect("blossom pool holds one slot per vertex");

        self.blossombase[b] = base;
        self.blossomparent[b] = NONE;
        self.blossomparent[bb] = b;

        let mut path = Vec::new();
        let mut endps = Vec::new();
        while bv != bb {
            self.blossomparent[bv] = b;
            path.push(bv);
            endps.push(self.labelend[bv]);
            v = self.endpoint[self.labelend[bv]];
            bv = self.inblossom[v];
        }
        path.push(bb);
        path.reverse();
        endps.reverse();
        endps.push(2 * k);
        while bw != bb {
            self.blossomparent[bw] = b;
            path.push(bw);
            endps.push(self.labelend[bw] ^ 1);
            w = self.endpoint[self.labelend[bw]];
            bw = self.inblossom[w];
        }

        self.label[b] = 1;
        self.labelend[b] = self.labelend[bb];
        self.dualvar[b] = 0;
        self.blossomchilds[b] = path.clone();
        self.blossomendps[b] = endps;

        for leaf in self.leaves(b) {
            if self.label[self.inblossom[leaf]] == 2 {
                self.queue.push(leaf);
            }
            self.inblossom[leaf] = b;
        }

        let mut bestedgeto = vec![NONE; 2 * self.nvertex];
        for &child in &path {
            let nblists: Vec<Vec<usize>> = match self.blossombestedges[child].take() {
                Some(list) => vec![list],
                None => self
                    .leaves(child)
                    .iter()
                    .map(|&leaf| self.neighbend[leaf].iter().map(|p| p / 2).collect())
                    .collect(),
            };
            for nblist in nblists {
                for edge in nblist {
                    let (i, mut j, _) = self.edges[edge];
                    if self.inblossom[j] == b {
                        j = i;
                    }
                    let bj = self.inblossom[j];
                    if bj != b
                        && self.label[bj] == 1
                        && (bestedgeto[bj] == NONE || self.slack(edge) < self.slack(bestedgeto[bj]))
                    {
                        bestedgeto[bj] = edge;
                    }
                }
            }
            self.bestedge[child] = NONE;
        }

        let best: Vec<usize> = bestedgeto.into_iter().filter(|&e| e != NONE).collect();
        self.bestedge[b] = NONE;
        for &edge in &best {
            if self.bestedge[b] == NONE || self.slack(edge) < self.slack(self.bestedge[b]) {
                self.bestedge[b] = edge;
            }
        }
        self.blossombestedges[b] = Some(best);
    }

    /// Dissolve blossom `b`, relabelling its children when it is an inner
    /// blossom expanded in the middle of a stage.
    fn expand_blossom(&mut self, b: usize, endstage: bool) {
        let childs = self.blossomchilds[b].clone();
        for &s in &childs {
            self.blossomparent[s] = NONE;
            if s < self.nvertex {
                self.inblossom[s] = s;
            } else if endstage && self.dualvar[s] == 0 {
                self.expand_blossom(s, endstage);
            } else {
                for leaf in self.leaves(s) {
                    self.inblossom[leaf] = s;
                }
            }
        }

        if !endstage && self.label[b] == 2 {
            let len = childs.len();
            let endps = self.blossomendps[b].clone();
            let entrychild = self.inblossom[self.endpoint[self.labelend[b] ^ 1]];
            let pos = childs.iter().position(|&c| c == entrychild).unwrap_or(0) as isize;
            let (mut j, jstep, endptrick): (isize, isize, usize) = if pos & 1 != 0 {
                (pos - len as isize, 1, 0)
            } else {
                (pos, -1, 1)
            };

            let mut p = self.labelend[b];
            while j != 0 {
                let back = endps[cyclic(len, j - endptrick as isize)];
                self.label[self.endpoint[p ^ 1]] = 0;
                self.label[self.endpoint[back ^ endptrick ^ 1]] = 0;
                self.assign_label(self.endpoint[p ^ 1], 2, p);
                self.allowedge[back / 2] = true;
                j += jstep;
                p = endps[cyclic(len, j - endptrick as isize)] ^ endptrick;
                self.allowedge[p / 2] = true;
                j += jstep;
            }

            let bv = childs[cyclic(len, j)];
            let entry = self.endpoint[p ^ 1];
            self.label[entry] = 2;
            self.label[bv] = 2;
            self.labelend[entry] = p;
            self.labelend[bv] = p;
            self.bestedge[bv] = NONE;
            j += jstep;

            while childs[cyclic(len, j)] != entrychild {
                let bv = childs[cyclic(len, j)];
                if self.label[bv] == 1 {
                    j += jstep;
                    continue;
                }
                let reached = self.leaves(bv).into_iter().find(|&leaf| self.label[leaf] != 0);
                if let Some(v) = reached {
                    self.label[v] = 0;
                    let mb = self.mate[self.blossombase[bv]];
                    self.label[self.endpoint[mb]] = 0;
                    self.assign_label(v, 2, self.labelend[v]);
                }
                j += jstep;
            }
        }

        self.label[b] = 0;
        self.labelend[b] = NONE;
        self.blossomchilds[b].clear();
        self.blossomendps[b].clear();
        self.blossombase[b] = NONE;
        self.blossombestedges[b] = None;
        self.bestedge[b] = NONE;
        self.unusedblossoms.push(b);
    }

    /// Swap matched and unmatched edges along the path through blossom `b`
    /// from vertex `v` to the base.
    fn augment_blossom(&mut self, b: usize, v: usize) {
        let mut t = v;
        while self.blossomparent[t] != b {
            t = self.blossomparent[t];
        }
        if t >= self.nvertex {
            self.augment_blossom(t, v);
        }

        let len = self.blossomchilds[b].len();
        let i = self.blossomchilds[b].iter().position(|&c| c == t).unwrap_or(0);
        let (mut j, jstep, endptrick): (isize, isize, usize) = if i & 1 != 0 {
            (i as isize - len as isize, 1, 0)
        } else {
            (i as isize, -1, 1)
        };

        while j != 0 {
            j += jstep;
            let child = self.blossomchilds[b][cyclic(len, j)];
            let p = self.blossomendps[b][cyclic(len, j - endptrick as isize)] ^ endptrick;
            if child >= self.nvertex {
                self.augment_blossom(child, self.endpoint[p]);
            }
            j += jstep;
            let child = self.blossomchilds[b][cyclic(len, j)];
            if child >= self.nvertex {
                self.augment_blossom(child, self.endpoint[p ^ 1]);
            }
            self.mate[self.endpoint[p]] = p ^ 1;
            self.mate[self.endpoint[p ^ 1]] = p;
        }

        self.blossomchilds[b].rotate_left(i);
        self.blossomendps[b].rotate_left(i);
        self.blossombase[b] = self.blossombase[self.blossomchilds[b][0]];
    }

    /// Augment the matching along the path through edge `k`.
    fn augment_matching(&mut self, k: usize) {
        let (v, w, _) = self.edges[k];
        for (start, first) in [(v, 2 * k + 1), (w, 2 * k)] {
            let (mut s, mut p) = (start, first);
            loop {
                let bs = self.inblossom[s];
                if bs >= self.nvertex {
                    self.augment_blossom(bs, s);
                }
                self.mate[s] = p;
                if self.labelend[bs] == NONE {
                    break;
                }
                let t = self.endpoint[self.labelend[bs]];
                let bt = self.inblossom[t];
                s = self.endpoint[self.labelend[bt]];
                let j = self.endpoint[self.labelend[bt] ^ 1];
                if bt >= self.nvertex {
                    self.augment_blossom(bt, j);
                }
                self.mate[j] = self.labelend[bt];
                p = self.labelend[bt] ^ 1;
            }
        }
    }

    /// Grow alternating trees from the queue. Returns true after an augmentation.
    fn scan_queue(&mut self) -> bool {
        while let Some(v) = self.queue.pop() {
            for idx in 0..self.neighbend[v].len() {
                let p = self.neighbend[v][idx];
                let k = p / 2;
                let w = self.endpoint[p];
                if self.inblossom[v] == self.inblossom[w] {
                    continue;
                }
                let mut kslack = 0;
                if !self.allowedge[k] {
                    kslack = self.slack(k);
                    if kslack <= 0 {
                        self.allowedge[k] = true;
                    }
                }
                if self.allowedge[k] {
                    if self.label[self.inblossom[w]] == 0 {
                        self.assign_label(w, 2, p ^ 1);
                    } else if self.label[self.inblossom[w]] == 1 {
                        let base = self.scan_blossom(v, w);
                        if base != NONE {
                            self.add_blossom(base, k);
                        } else {
                            self.augment_matching(k);
                            return true;
                        }
                    } else if self.label[w] == 0 {
                        self.label[w] = 2;
                        self.labelend[w] = p ^ 1;
                    }
                } else if self.label[self.inblossom[w]] == 1 {
                    let b = self.inblossom[v];
                    if self.bestedge[b] == NONE || kslack < self.slack(self.bestedge[b]) {
                        self.bestedge[b] = k;
                    }
                } else if self.label[w] == 0 && (self.bestedge[w] == NONE || kslack < self.slack(self.bestedge[w])) {
                    self.bestedge[w] = k;
                }
            }
        }
        false
    }

    fn min_vertex_dual(&self) -> i64 {
        self.dualvar[..self.nvertex].iter().copied().min().unwrap_or(0)
    }

    fn solve(mut self) -> Vec<Option<usize>> {
        let n = self.nvertex;
        for _stage in 0..n {
            self.label.fill(0);
            self.bestedge.fill(NONE);
            for slot in &mut self.blossombestedges[n..] {
                *slot = None;
            }
            self.allowedge.fill(false);
            self.queue.clear();

            for v in 0..n {
                if self.mate[v] == NONE && self.label[self.inblossom[v]] == 0 {
                    self.assign_label(v, 1, NONE);
                }
            }

            let mut augmented = false;
            loop {
                if self.scan_queue() {
                    augmented = true;
                    break;
                }

                // 0 = none yet, 1 = stop, 2 = free vertex edge, 3 = S-S edge, 4 = expand T-blossom
                let mut deltatype = 0u8;
                let mut delta = 0i64;
                let mut deltaedge = NONE;
                let mut deltablossom = NONE;

                if !self.max_cardinality {
                    deltatype = 1;
                    delta = self.min_vertex_dual();
                }
                for v in 0..n {
                    if self.label[self.inblossom[v]] == 0 && self.bestedge[v] != NONE {
                        let d = self.slack(self.bestedge[v]);
                        if deltatype == 0 || d < delta {
                            delta = d;
                            deltatype = 2;
                            deltaedge = self.bestedge[v];
                        }
                    }
                }
                for b in 0..2 * n {
                    if self.blossomparent[b] == NONE && self.label[b] == 1 && self.bestedge[b] != NONE {
                        let d = self.slack(self.bestedge[b]) / 2;
                        if deltatype == 0 || d < delta {
                            delta = d;
                            deltatype = 3;
                            deltaedge = self.bestedge[b];
                        }
                    }
                }
                for b in n..2 * n {
                    if self.blossombase[b] != NONE
                        && self.blossomparent[b] == NONE
                        && self.label[b] == 2
                        && (deltatype == 0 || self.dualvar[b] < delta)
                    {
                        delta = self.dualvar[b];
                        deltatype = 4;
                        deltablossom = b;
                    }
                }
                if deltatype == 0 {
                    deltatype = 1;
                    delta = self.min_vertex_dual().max(0);
                }

                for v in 0..n {
                    match self.label[self.inblossom[v]] {
                        1 => self.dualvar[v] -= delta,
                        2 => self.dualvar[v] += delta,
                        _ => {}
                    }
                }
                for b in n..2 * n {
                    if self.blossombase[b] != NONE && self.blossomparent[b] == NONE {
                        match self.label[b] {
                            1 => self.dualvar[b] += delta,
                            2 => self.dualvar[b] -= delta,
                            _ => {}
                        }
                    }
                }

                match deltatype {
                    1 => break,
                    2 => {
                        self.allowedge[deltaedge] = true;
                        let (mut i, j, _) = self.edges[deltaedge];
                        if self.label[self.inblossom[i]] == 0 {
                            i = j;
                        }
                        self.queue.push(i);
                    }
                    3 => {
                        self.allowedge[deltaedge] = true;
                        let (i, _, _) = self.edges[deltaedge];
                        self.queue.push(i);
                    }
                    _ => self.expand_blossom(deltablossom, false),
                }
            }

            if !augmented {
                break;
            }

            for b in n..2 * n {
                if self.blossomparent[b] == NONE
                    && self.blossombase[b] != NONE
                    && self.label[b] == 1
                    && self.dualvar[b] == 0
                {
                    self.expand_blossom(b, true);
                }
            }
        }

        self.mate
            .iter()
            .map(|&p| if p == NONE { None } else { Some(self.endpoint[p]) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(n: usize, edges: &[WeightedEdge], max_cardinality: bool) -> (usize, i64) {
        fn go(
            v: usize,
            n: usize,
            used: &mut Vec<bool>,
            adj: &[Vec<(usize, i64)>],
            size: usize,
            weight: i64,
            best: &mut (usize, i64),
            max_cardinality: bool,
        ) {
            if v == n {
                let better = if max_cardinality {
                    (size, weight) > *best
                } else {
                    weight > best.1
                };
                if better {
                    *best = (size, weight);
                }
                return;
            }
            if used[v] {
                go(v + 1, n, used, adj, size, weight, best, max_cardinality);
                return;
            }
            go(v + 1, n, used, adj, size, weight, best, max_cardinality);
            for &(u, w) in &adj[v] {
                if u > v && !used[u] {
                    used[v] = true;
                    used[u] = true;
                    go(v + 1, n, used, adj, size + 1, weight + w, best, max_cardinality);
                    used[v] = false;
                    used[u] = false;
                }
            }
        }

        let mut adj = vec![Vec::new(); n];
        for &(u, v, w) in edges {
            adj[u].push((v, w));
            adj[v].push((u, w));
        }
        let mut best = (0, 0);
        go(0, n, &mut vec![false; n], &adj, 0, 0, &mut best, max_cardinality);
        best
    }

    fn check_valid(n: usize, edges: &[WeightedEdge], mates: &[Option<usize>]) {
        assert_eq!(mates.len(), n);
        for (v, mate) in mates.iter().enumerate() {
            if let Some(u) = *mate {
                assert_eq!(mates[u], Some(v), "mates must be symmetric");
                assert!(edges.iter().any(|&(a, b, _)| (a, b) == (u, v) || (a, b) == (v, u)));
            }
        }
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(max_weight_matching(3, &[], false), vec![None, None, None]);
    }

    #[test]
    fn test_single_edge() {
        assert_eq!(max_weight_matching(2, &[(0, 1, 1)], false), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_prefers_heavier_edge() {
        let mates = max_weight_matching(3, &[(0, 1, 10), (1, 2, 11)], false);
        assert_eq!(mates, vec![None, Some(2), Some(1)]);
    }

    #[test]
    fn test_path_of_three_edges() {
        let edges = [(0, 1, 5), (1, 2, 11), (2, 3, 5)];
        assert_eq!(max_weight_matching(4, &edges, false), vec![None, Some(2), Some(1), None]);
        assert_eq!(max_weight_matching(4, &edges, true), vec![Some(1), Some(0), Some(3), Some(2)]);
    }

    #[test]
    fn test_negative_weights() {
        let edges = [(0, 1, 2), (0, 2, -2), (1, 2, 1), (1, 3, -1), (2, 3, -6)];
        assert_eq!(max_weight_matching(4, &edges, false), vec![Some(1), Some(0), None, None]);
        assert_eq!(max_weight_matching(4, &edges, true), vec![Some(2), Some(3), Some(0), Some(1)]);
    }

    #[test]
    fn test_blossom_with_stem() {
        let edges = [(1, 2, 8), (1, 3, 9), (2, 3, 10), (3, 4, 7)];
        let mates = max_weight_matching(5, &edges, false);
        assert_eq!(mates, vec![None, Some(2), Some(1), Some(4), Some(3)]);
    }

    #[test]
    fn test_nested_blossoms() {
        let edges = [(1, 2, 9), (1, 3, 9), (2, 3, 10), (2, 4, 8), (3, 5, 8), (4, 5, 10), (5, 6, 6)];
        let mates = max_weight_matching(7, &edges, false);
        assert_eq!(mates, vec![None, Some(3), Some(4), Some(1), Some(2), Some(6), Some(5)]);
    }

    #[test]
    fn test_matches_brute_force_on_random_graphs() {
        let mut rng = StdRng::seed_from_u64(2024);
        for round in 0..200 {
            let n = rng.gen_range(2..=8);
            let mut edges = Vec::new();
            for u in 0..n {
                for v in (u + 1)..n {
                    if rng.gen_bool(0.5) {
                        edges.push((u, v, rng.gen_range(-3..=20)));
                    }
                }
            }
            for &max_cardinality in &[false, true] {
                let mates = max_weight_matching(n, &edges, max_cardinality);
                check_valid(n, &edges, &mates);
                let size = mates.iter().filter(|m| m.is_some()).count() / 2;
                let weight = matching_weight(&edges, &mates);
                let (best_size, best_weight) = brute_force(n, &edges, max_cardinality);
                if max_cardinality {
                    assert_eq!((size, weight), (best_size, best_weight), "round {}", round);
                } else {
                    assert_eq!(weight, best_weight, "round {}", round);
                }
            }
        }
    }
}
