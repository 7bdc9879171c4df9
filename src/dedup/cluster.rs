// Ampere Charging Data Project
// Folds pairwise duplicate judgments into disjoint clusters
//
// Union-find over integer indices into the record array, with path
// compression and union by rank. A pair that bridges two already-built
// clusters unifies them, so the resulting partition is a true set of
// equivalence classes regardless of pair discovery order.

use super::{Cluster, DuplicatePair, StationRecord};
use ahash::AHashMap;

pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    /// Root of the set containing `x`, compressing the path on the way.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return;
        }

        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

/// Group an unordered stream of duplicate pairs into disjoint clusters.
///
/// Only records that appear in at least one pair are clustered; cluster
/// members and the cluster list itself come out in ascending identifier
/// order so a pass over the same input is deterministic.
pub fn build_clusters(pairs: &[DuplicatePair]) -> Vec<Cluster> {
    let mut index_of: AHashMap<&str, usize> = AHashMap::new();
    let mut records: Vec<&StationRecord> = Vec::new();

    for pair in pairs {
        for record in [&pair.station, &pair.duplicate] {
            index_of.entry(record.identifier.as_str()).or_insert_with(|| {
                records.push(record);
                records.len() - 1
            });
        }
    }

    let mut union_find = UnionFind::new(records.len());
    for pair in pairs {
        let a = index_of[pair.station.identifier.as_str()];
        let b = index_of[pair.duplicate.identifier.as_str()];
        union_find.union(a, b);
    }

    let mut groups: AHashMap<usize, Vec<&StationRecord>> = AHashMap::new();
    for index in 0..records.len() {
        let root = union_find.find(index);
        groups.entry(root).or_default().push(records[index]);
    }

    let mut clusters: Vec<Cluster> = groups
        .into_values()
        .map(|mut members| {
            members.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            Cluster {
                members: members.into_iter().cloned().collect(),
            }
        })
        .collect();

    clusters.sort_by(|a, b| a.members[0].identifier.cmp(&b.members[0].identifier));
    clusters
}
