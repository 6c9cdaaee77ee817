//! The pinch thread set: linear coordinate strips whose bases can be
//! welded into equivalence classes.
//!
//! Threads occupy disjoint ranges of one global base space. Every base
//! has a forward and a reverse oriented position, and a pinch unites
//! strand-consistent pairs of positions across two ranges. The quotient
//! (blocks of equivalent bases, chained across trivial boundaries) is
//! computed once after all pinching and drives the readout.

use std::collections::{HashMap, HashSet};

use uf_rush::UFRush;

use crate::pos::{make_pos, Pos};

/// Dense identifier for a thread in the set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadHandle(usize);

#[derive(Debug, Clone)]
struct ThreadInfo {
    name: u64,
    first_base: usize,
    length: usize,
}

/// Where one base of one thread lands in the quotient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseSite {
    /// Chain (merged block) the base belongs to
    pub chain: usize,
    /// Position along the chain
    pub pos: usize,
    /// Thread-forward at this base runs against the chain direction
    pub reversed: bool,
}

/// A maximal run of one thread whose bases walk one chain without a break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub thread: ThreadHandle,
    /// First thread-local base of the run
    pub start: usize,
    pub length: usize,
    pub chain: usize,
    /// Chain position of the run's first base; positions decrease along
    /// the run when `reversed` is set
    pub chain_start: usize,
    pub reversed: bool,
}

#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub length: usize,
    pub cyclic: bool,
}

/// The joined quotient: per-base sites, chain table, and the segment list
#[derive(Debug, Clone)]
pub struct Quotient {
    sites: Vec<BaseSite>,
    chains: Vec<ChainInfo>,
    segments: Vec<Segment>,
}

impl Quotient {
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn chain(&self, id: usize) -> &ChainInfo {
        &self.chains[id]
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// A set of pinchable threads over a fixed global base capacity
pub struct PinchThreadSet {
    threads: Vec<ThreadInfo>,
    by_name: HashMap<u64, ThreadHandle>,
    uf: UFRush,
    used: usize,
    capacity: usize,
    quotient: Option<Quotient>,
}

impl PinchThreadSet {
    /// Create a set able to hold `capacity` bases in total. The capacity
    /// is fixed up front because the union-find does not grow.
    pub fn new(capacity: usize) -> Self {
        PinchThreadSet {
            threads: Vec::new(),
            by_name: HashMap::new(),
            uf: UFRush::new((capacity.max(1)) * 2),
            used: 0,
            capacity,
            quotient: None,
        }
    }

    /// Add a thread of `length` bases under a fresh numeric name
    pub fn add_thread(&mut self, name: u64, length: usize) -> ThreadHandle {
        assert!(length > 0, "threads must carry at least one base");
        assert!(
            self.used + length <= self.capacity,
            "thread set capacity exceeded"
        );
        assert!(
            !self.by_name.contains_key(&name),
            "thread name {} already in use",
            name
        );
        let handle = ThreadHandle(self.threads.len());
        self.threads.push(ThreadInfo {
            name,
            first_base: self.used,
            length,
        });
        self.by_name.insert(name, handle);
        self.used += length;
        self.quotient = None;
        handle
    }

    pub fn thread_by_name(&self, name: u64) -> Option<ThreadHandle> {
        self.by_name.get(&name).copied()
    }

    pub fn thread_name(&self, t: ThreadHandle) -> u64 {
        self.threads[t.0].name
    }

    pub fn thread_length(&self, t: ThreadHandle) -> usize {
        self.threads[t.0].length
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn threads(&self) -> impl Iterator<Item = ThreadHandle> {
        (0..self.threads.len()).map(ThreadHandle)
    }

    fn global(&self, t: ThreadHandle, off: usize) -> usize {
        let info = &self.threads[t.0];
        debug_assert!(off < info.length);
        info.first_base + off
    }

    /// Weld `length` bases of thread `a` starting at `off_a` to `length`
    /// bases of thread `b` starting at `off_b`. With `same_orientation`
    /// the ranges run parallel; without it base i of the first range
    /// matches base length-1-i of the second, strands swapped.
    pub fn pinch(
        &mut self,
        a: ThreadHandle,
        b: ThreadHandle,
        off_a: usize,
        off_b: usize,
        length: usize,
        same_orientation: bool,
    ) {
        assert!(off_a + length <= self.threads[a.0].length);
        assert!(off_b + length <= self.threads[b.0].length);
        for i in 0..length {
            let ga = self.global(a, off_a + i);
            if same_orientation {
                let gb = self.global(b, off_b + i);
                self.uf.unite(make_pos(ga, false) as usize, make_pos(gb, false) as usize);
                self.uf.unite(make_pos(ga, true) as usize, make_pos(gb, true) as usize);
            } else {
                let gb = self.global(b, off_b + length - 1 - i);
                self.uf.unite(make_pos(ga, false) as usize, make_pos(gb, true) as usize);
                self.uf.unite(make_pos(ga, true) as usize, make_pos(gb, false) as usize);
            }
        }
        self.quotient = None;
    }

    /// Whether two bases have been welded together (on either strand)
    pub fn same_base(
        &self,
        a: ThreadHandle,
        off_a: usize,
        b: ThreadHandle,
        off_b: usize,
    ) -> bool {
        let ga = self.global(a, off_a);
        let gb = self.global(b, off_b);
        let root_a = self.uf.find(make_pos(ga, false) as usize);
        root_a == self.uf.find(make_pos(gb, false) as usize)
            || root_a == self.uf.find(make_pos(gb, true) as usize)
    }

    /// The quotient computed by the last join, if still valid
    pub fn quotient(&self) -> Option<&Quotient> {
        self.quotient.as_ref()
    }

    /// The joined site of one thread base. Panics if the boundaries have
    /// not been joined since the last mutation.
    pub fn site(&self, t: ThreadHandle, off: usize) -> BaseSite {
        let q = self
            .quotient
            .as_ref()
            .expect("join_trivial_boundaries must run before site queries");
        q.sites[self.global(t, off)]
    }

    /// Join trivial boundaries and compute the quotient.
    ///
    /// A boundary between two distinct oriented blocks is trivial when it
    /// is the sole outgoing adjacency of the first and the sole incoming
    /// adjacency of the second; trivial boundaries chain blocks into runs
    /// that the readout turns into single nodes. The computation is
    /// deterministic, so joining twice equals joining once.
    pub fn join_trivial_boundaries(&mut self) -> &Quotient {
        if self.quotient.is_none() {
            self.quotient = Some(self.compute_quotient());
        }
        self.quotient.as_ref().unwrap()
    }

    fn compute_quotient(&self) -> Quotient {
        let nbases = self.used;

        // Canonical strand of each class: the class holding the smallest
        // oriented position. Scanning positions in ascending order makes
        // the choice independent of the order pinches were issued in.
        let mut min_pos_of_root: HashMap<usize, Pos> = HashMap::new();
        for p in 0..(nbases * 2) as u64 {
            let root = self.uf.find(p as usize);
            min_pos_of_root.entry(root).or_insert(p);
        }

        // Per-base block key and block-relative strand
        let mut block_of: Vec<usize> = vec![0; nbases];
        let mut strand_of: Vec<bool> = vec![false; nbases];
        let mut block_ids: HashMap<Pos, usize> = HashMap::new();
        for g in 0..nbases {
            let rf = self.uf.find(make_pos(g, false) as usize);
            let rr = self.uf.find(make_pos(g, true) as usize);
            let mf = min_pos_of_root[&rf];
            let mr = min_pos_of_root[&rr];
            let (key, reversed) = if mf <= mr { (mf, false) } else { (mr, true) };
            let next_id = block_ids.len();
            let id = *block_ids.entry(key).or_insert(next_id);
            block_of[g] = id;
            strand_of[g] = reversed;
        }
        let nblocks = block_ids.len();

        // Oriented-block adjacency from consecutive bases of every
        // thread, recorded in both walk directions
        let enc = |block: usize, rev: bool| ((block as u64) << 1) | (rev as u64);
        let mut out: HashMap<u64, u64> = HashMap::new();
        let mut out_multi: HashSet<u64> = HashSet::new();
        let mut inc: HashMap<u64, u64> = HashMap::new();
        let mut inc_multi: HashSet<u64> = HashSet::new();
        let note = |map: &mut HashMap<u64, u64>, multi: &mut HashSet<u64>, from: u64, to: u64| {
            match map.get(&from).copied() {
                Some(existing) if existing != to => {
                    multi.insert(from);
                }
                Some(_) => {}
                None => {
                    map.insert(from, to);
                }
            }
        };
        for info in &self.threads {
            for i in 0..info.length.saturating_sub(1) {
                let g = info.first_base + i;
                let x = enc(block_of[g], strand_of[g]);
                let y = enc(block_of[g + 1], strand_of[g + 1]);
                note(&mut out, &mut out_multi, x, y);
                note(&mut inc, &mut inc_multi, y, x);
                // the same adjacency walked the other way
                let xm = enc(block_of[g + 1], !strand_of[g + 1]);
                let ym = enc(block_of[g], !strand_of[g]);
                note(&mut out, &mut out_multi, xm, ym);
                note(&mut inc, &mut inc_multi, ym, xm);
            }
        }

        // Trivial pairings: unique successor meeting unique predecessor
        let mut next: HashMap<u64, u64> = HashMap::new();
        let mut prev: HashMap<u64, u64> = HashMap::new();
        for (&x, &y) in &out {
            if out_multi.contains(&x) || inc_multi.contains(&y) {
                continue;
            }
            if inc.get(&y) != Some(&x) {
                continue;
            }
            if x >> 1 == y >> 1 {
                // a block adjacent to itself is a repeat, not a boundary
                continue;
            }
            next.insert(x, y);
            prev.insert(y, x);
        }

        // Chain every block once, walking back to the run head first.
        // A fully cyclic run is broken at its smallest block.
        let mut chain_of: Vec<Option<(usize, usize, bool)>> = vec![None; nblocks];
        let mut chains: Vec<ChainInfo> = Vec::new();
        for b in 0..nblocks {
            if chain_of[b].is_some() {
                continue;
            }
            let start = enc(b, false);
            let mut head = start;
            let mut cyclic = false;
            while let Some(&p) = prev.get(&head) {
                if p == start {
                    cyclic = true;
                    head = start;
                    break;
                }
                head = p;
            }
            let chain_id = chains.len();
            let mut pos = 0;
            let mut cur = head;
            loop {
                let blk = (cur >> 1) as usize;
                if chain_of[blk].is_some() {
                    break;
                }
                chain_of[blk] = Some((chain_id, pos, cur & 1 == 1));
                pos += 1;
                match next.get(&cur) {
                    Some(&n) => cur = n,
                    None => break,
                }
            }
            chains.push(ChainInfo {
                length: pos,
                cyclic,
            });
        }

        // Per-base sites
        let mut sites = Vec::with_capacity(nbases);
        for g in 0..nbases {
            let (chain, pos, chain_rev) = chain_of[block_of[g]].expect("block left unchained");
            sites.push(BaseSite {
                chain,
                pos,
                reversed: strand_of[g] != chain_rev,
            });
        }

        // Segments: maximal per-thread runs that keep walking one chain
        let mut segments = Vec::new();
        for (t, info) in self.threads.iter().enumerate() {
            let mut run_start = 0;
            for i in 0..info.length {
                let here = sites[info.first_base + i];
                let continues = if i + 1 < info.length {
                    let next_site = sites[info.first_base + i + 1];
                    next_site.chain == here.chain
                        && next_site.reversed == here.reversed
                        && if here.reversed {
                            here.pos > 0 && next_site.pos == here.pos - 1
                        } else {
                            next_site.pos == here.pos + 1
                        }
                } else {
                    false
                };
                if !continues {
                    let first = sites[info.first_base + run_start];
                    segments.push(Segment {
                        thread: ThreadHandle(t),
                        start: run_start,
                        length: i + 1 - run_start,
                        chain: first.chain,
                        chain_start: first.pos,
                        reversed: first.reversed,
                    });
                    run_start = i + 1;
                }
            }
        }

        Quotient {
            sites,
            chains,
            segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_pinch_welds_bases() {
        let mut ts = PinchThreadSet::new(8);
        let a = ts.add_thread(0, 4);
        let b = ts.add_thread(1, 4);
        assert!(!ts.same_base(a, 0, b, 0));

        ts.pinch(a, b, 0, 0, 4, true);
        for i in 0..4 {
            assert!(ts.same_base(a, i, b, i));
        }
    }

    #[test]
    fn test_antiparallel_pinch_mirrors_offsets() {
        let mut ts = PinchThreadSet::new(8);
        let a = ts.add_thread(0, 4);
        let b = ts.add_thread(1, 4);

        ts.pinch(a, b, 0, 0, 4, false);
        for i in 0..4 {
            assert!(ts.same_base(a, i, b, 3 - i));
            if i != 3 - i {
                assert!(!ts.same_base(a, i, b, i));
            }
        }
    }

    #[test]
    fn test_join_merges_unbranching_run() {
        // two 2-base threads glued end to start through a 4-base thread
        let mut ts = PinchThreadSet::new(8);
        let a1 = ts.add_thread(0, 2);
        let a2 = ts.add_thread(1, 2);
        let b = ts.add_thread(2, 4);
        ts.pinch(a1, b, 0, 0, 2, true);
        ts.pinch(a2, b, 0, 2, 2, true);

        let q = ts.join_trivial_boundaries();
        assert_eq!(q.chain_count(), 1);
        assert_eq!(q.chain(0).length, 4);
        assert!(!q.chain(0).cyclic);
        // each thread contributes exactly one segment
        assert_eq!(q.segments().len(), 3);
    }

    #[test]
    fn test_branch_point_keeps_boundary() {
        // thread c shares its first two bases with a, last two with b:
        // the middle boundary has conflicting neighbors and must stay
        let mut ts = PinchThreadSet::new(12);
        let a = ts.add_thread(0, 3);
        let b = ts.add_thread(1, 3);
        let c = ts.add_thread(2, 4);
        ts.pinch(a, c, 0, 0, 2, true);
        ts.pinch(b, c, 1, 2, 2, true);

        let q = ts.join_trivial_boundaries();
        // a's tail and b's head stay separate chains from the shared runs
        assert!(q.chain_count() > 1);
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut ts = PinchThreadSet::new(8);
        let a = ts.add_thread(0, 4);
        let b = ts.add_thread(1, 4);
        ts.pinch(a, b, 0, 0, 4, false);

        let first: Vec<Segment> = ts.join_trivial_boundaries().segments().to_vec();
        let second: Vec<Segment> = ts.join_trivial_boundaries().segments().to_vec();
        assert_eq!(first, second);

        // force a recomputation of the same state
        let recomputed = ts.compute_quotient();
        assert_eq!(recomputed.segments(), first.as_slice());
    }

    #[test]
    fn test_antiparallel_join_orientation() {
        let mut ts = PinchThreadSet::new(8);
        let a = ts.add_thread(0, 4);
        let b = ts.add_thread(1, 4);
        ts.pinch(a, b, 0, 0, 4, false);
        ts.join_trivial_boundaries();

        let sa = ts.site(a, 0);
        let sb = ts.site(b, 3);
        assert_eq!(sa.chain, sb.chain);
        assert_eq!(sa.pos, sb.pos);
        assert_ne!(sa.reversed, sb.reversed);
    }

    #[test]
    fn test_unpinched_threads_stay_apart() {
        let mut ts = PinchThreadSet::new(6);
        let a = ts.add_thread(0, 3);
        let b = ts.add_thread(1, 3);
        ts.join_trivial_boundaries();

        let site_a = ts.site(a, 0);
        let site_b = ts.site(b, 0);
        assert_ne!(site_a.chain, site_b.chain);

        let q = ts.quotient().unwrap();
        assert_eq!(q.chain_count(), 2);
        assert_eq!(q.chain(site_a.chain).length, 3);
        assert_eq!(q.chain(site_b.chain).length, 3);
    }
}
