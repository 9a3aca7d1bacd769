// Incremental clustering of annotation footprints.
//
// Entries live in one arena and are addressed by index. Standalone entries
// that join a cluster stay in the arena as members but leave the grid;
// clusters absorbed by another cluster are kept as empty tombstones.
// Cluster member lists only ever hold standalone entries: when two clusters
// merge, the absorbed cluster's members are moved over directly.

use crate::config::ClusterConfig;
use crate::geometry::{Mbr, Point};
use crate::grid::CellGrid;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Shared bounds of every clustering entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    /// Footprint for standalone entries, marker rectangle for clusters.
    pub pts: Vec<Point>,
    /// Bounds padded by half the scaled marker size. Clusters cover the
    /// padded bounds of all their members.
    pub mbr: Mbr,
    pub center: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind<H> {
    Standalone(H),
    Cluster(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry<H> {
    pub bounds: Bounds,
    /// Cluster this entry was folded into. Only entries without a parent
    /// are registered in the grid.
    pub parent: Option<usize>,
    pub kind: EntryKind<H>,
}

impl<H> Entry<H> {
    pub fn is_live(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self.kind, EntryKind::Cluster(_))
    }
}

/// Outcome of [`ClusterBuilder::resolve_clusters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Complete { merges: usize },
    /// The cancel flag was seen between scans. The builder is consistent
    /// but clusters may still overlap.
    Cancelled { merges: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandaloneEntry<H> {
    pub handle: H,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEntry<H> {
    pub bounds: Bounds,
    pub handles: Vec<H>,
}

/// Final read-out of a clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPartition<H> {
    pub standalone: Vec<StandaloneEntry<H>>,
    pub clusters: Vec<ClusterEntry<H>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBuilder<H> {
    grid: CellGrid,
    marker_size: Point,
    entries: Vec<Entry<H>>,
    merges: usize,
}

impl<H> ClusterBuilder<H> {
    pub fn new(mbr: Mbr, size_x: usize, size_y: usize, config: &ClusterConfig) -> Self {
        Self {
            grid: CellGrid::new(mbr, size_x, size_y),
            marker_size: config.scaled_marker_size(),
            entries: Vec::new(),
            merges: 0,
        }
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn entries(&self) -> &[Entry<H>] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Entry<H>> {
        self.entries.get(index)
    }

    /// Cluster-to-cluster merges performed so far.
    pub fn merge_count(&self) -> usize {
        self.merges
    }

    /// Live standalone entries: `(index, handle, bounds)`.
    pub fn standalone(&self) -> impl Iterator<Item = (usize, &H, &Bounds)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_live())
            .filter_map(|(idx, entry)| match &entry.kind {
                EntryKind::Standalone(handle) => Some((idx, handle, &entry.bounds)),
                EntryKind::Cluster(_) => None,
            })
    }

    /// Live clusters: `(index, bounds, member indices)`.
    pub fn clusters(&self) -> impl Iterator<Item = (usize, &Bounds, &[usize])> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_live())
            .filter_map(|(idx, entry)| match &entry.kind {
                EntryKind::Cluster(members) => Some((idx, &entry.bounds, members.as_slice())),
                EntryKind::Standalone(_) => None,
            })
    }

    fn pad(&self) -> (f32, f32) {
        (self.marker_size.0 * 0.5, self.marker_size.1 * 0.5)
    }

    /// Add one annotation. It either stays standalone, forms a new cluster
    /// with the standalone entry it overlaps, or joins an overlapping
    /// cluster. Clusters win over standalone entries; among equals the
    /// earliest entry wins.
    pub fn add_object(&mut self, handle: H, pts: &[Point]) {
        let raw = Mbr::from_points(pts);
        let center = raw.center();
        let (pad_x, pad_y) = self.pad();
        let mbr = raw.expand(pad_x, pad_y);

        let mut hit_standalone = None;
        let mut hit_cluster = None;
        for idx in self.grid.find_objects_within(&mbr) {
            let entry = &self.entries[idx];
            debug_assert!(entry.is_live(), "grid holds absorbed entry {idx}");
            if !entry.bounds.mbr.overlaps(&mbr) {
                continue;
            }
            if entry.is_cluster() {
                hit_cluster = Some(idx);
                break;
            }
            if hit_standalone.is_none() {
                hit_standalone = Some(idx);
            }
        }

        let index = self.entries.len();
        self.entries.push(Entry {
            bounds: Bounds {
                pts: pts.to_vec(),
                mbr,
                center,
            },
            parent: None,
            kind: EntryKind::Standalone(handle),
        });

        match (hit_cluster, hit_standalone) {
            (Some(cluster), _) => {
                trace!(index, cluster, "joining cluster");
                self.entries[index].parent = Some(cluster);
                if let EntryKind::Cluster(members) = &mut self.entries[cluster].kind {
                    members.push(index);
                }
                self.regrow(cluster);
            }
            (None, Some(other)) => {
                let other_mbr = self.entries[other].bounds.mbr;
                self.grid.remove_from_cells(&other_mbr, other);
                let cluster = self.entries.len();
                self.entries[other].parent = Some(cluster);
                self.entries[index].parent = Some(cluster);
                let members = vec![other, index];
                let bounds = self.cluster_bounds(&members);
                self.grid.add_to_cells(&bounds.mbr, cluster);
                self.entries.push(Entry {
                    bounds,
                    parent: None,
                    kind: EntryKind::Cluster(members),
                });
                debug!(cluster, first = other, second = index, "formed cluster");
            }
            (None, None) => {
                self.grid.add_to_cells(&mbr, index);
                trace!(index, "standalone");
            }
        }
    }

    /// Merge clusters whose bounds overlap, scanning until a full scan finds
    /// nothing left to merge. `cancel` is polled before every scan; a flag
    /// that is already set leaves the builder untouched.
    pub fn resolve_clusters(&mut self, cancel: &AtomicBool) -> Resolution {
        let mut merges = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!(merges, "cluster resolution cancelled");
                return Resolution::Cancelled { merges };
            }
            let scan_merges = self.merge_scan();
            merges += scan_merges;
            if scan_merges == 0 {
                break;
            }
        }
        debug_assert!(self.grid_consistent());
        debug!(merges, "cluster resolution complete");
        Resolution::Complete { merges }
    }

    fn merge_scan(&mut self) -> usize {
        let mut merges = 0;
        for survivor in 0..self.entries.len() {
            if !(self.entries[survivor].is_live() && self.entries[survivor].is_cluster()) {
                continue;
            }
            while let Some(absorbed) = self.overlapping_cluster(survivor) {
                self.merge_into(survivor, absorbed);
                merges += 1;
            }
        }
        merges
    }

    fn overlapping_cluster(&self, cluster: usize) -> Option<usize> {
        let mbr = self.entries[cluster].bounds.mbr;
        self.grid.find_objects_within(&mbr).into_iter().find(|&idx| {
            let entry = &self.entries[idx];
            idx != cluster && entry.is_cluster() && entry.bounds.mbr.overlaps(&mbr)
        })
    }

    fn merge_into(&mut self, survivor: usize, absorbed: usize) {
        let absorbed_mbr = self.entries[absorbed].bounds.mbr;
        self.grid.remove_from_cells(&absorbed_mbr, absorbed);
        self.entries[absorbed].parent = Some(survivor);
        let moved = match &mut self.entries[absorbed].kind {
            EntryKind::Cluster(members) => std::mem::take(members),
            EntryKind::Standalone(_) => Vec::new(),
        };
        for &member in &moved {
            self.entries[member].parent = Some(survivor);
        }
        debug!(survivor, absorbed, moved = moved.len(), "merged clusters");
        if let EntryKind::Cluster(members) = &mut self.entries[survivor].kind {
            members.extend(moved);
        }
        self.regrow(survivor);
        self.merges += 1;
    }

    /// Recompute a cluster's bounds from its members and move its grid
    /// registration along with them.
    fn regrow(&mut self, cluster: usize) {
        let members = match &self.entries[cluster].kind {
            EntryKind::Cluster(members) => members.clone(),
            EntryKind::Standalone(_) => return,
        };
        let old_mbr = self.entries[cluster].bounds.mbr;
        let bounds = self.cluster_bounds(&members);
        self.grid.remove_from_cells(&old_mbr, cluster);
        self.grid.add_to_cells(&bounds.mbr, cluster);
        self.entries[cluster].bounds = bounds;
    }

    /// Union of the members' padded bounds, with the marker centred on the
    /// mean of the member centers.
    fn cluster_bounds(&self, members: &[usize]) -> Bounds {
        let mut mbr: Option<Mbr> = None;
        let mut sum = (0.0f32, 0.0f32);
        for &member in members {
            let bounds = &self.entries[member].bounds;
            mbr = Some(match mbr {
                Some(acc) => acc.union(&bounds.mbr),
                None => bounds.mbr,
            });
            sum.0 += bounds.center.0;
            sum.1 += bounds.center.1;
        }
        let count = members.len().max(1) as f32;
        let center = (sum.0 / count, sum.1 / count);
        let marker = Mbr::from_center_size(center, self.marker_size);
        Bounds {
            pts: marker.corners().to_vec(),
            mbr: mbr.unwrap_or(marker),
            center,
        }
    }

    /// Indices of the annotations a cluster stands for, as they were
    /// registered via [`add_object`](Self::add_object).
    pub fn members_of(&self, cluster: usize) -> &[usize] {
        match self.entries.get(cluster).map(|entry| &entry.kind) {
            Some(EntryKind::Cluster(members)) => members,
            _ => &[],
        }
    }

    /// Every entry sits in exactly the cells its bounds cover, and only
    /// entries without a parent are registered at all.
    pub fn grid_consistent(&self) -> bool {
        self.entries.iter().enumerate().all(|(idx, entry)| {
            let rect = entry.is_live().then_some(&entry.bounds.mbr);
            self.grid.is_registered_exactly(idx, rect)
        })
    }
}

impl<H: Clone> ClusterBuilder<H> {
    /// Annotation handles represented by a cluster. Empty for standalone
    /// entries and absorbed clusters.
    pub fn objects_for_cluster(&self, cluster: usize) -> Vec<H> {
        self.members_of(cluster)
            .iter()
            .filter_map(|&member| match &self.entries[member].kind {
                EntryKind::Standalone(handle) => Some(handle.clone()),
                EntryKind::Cluster(_) => None,
            })
            .collect()
    }
}

impl<H> ClusterBuilder<H> {
    /// Consume the builder, handing the surviving standalone entries and
    /// clusters to the caller.
    pub fn into_partition(self) -> ClusterPartition<H> {
        debug_assert!(self.grid_consistent());
        let mut handles: Vec<Option<H>> = Vec::with_capacity(self.entries.len());
        let mut rest = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            match entry.kind {
                EntryKind::Standalone(handle) => {
                    handles.push(Some(handle));
                    rest.push((entry.bounds, entry.parent, None));
                }
                EntryKind::Cluster(members) => {
                    handles.push(None);
                    rest.push((entry.bounds, entry.parent, Some(members)));
                }
            }
        }

        let mut standalone = Vec::new();
        let mut clusters = Vec::new();
        let mut pending = Vec::new();
        for (idx, (bounds, parent, members)) in rest.into_iter().enumerate() {
            if parent.is_some() {
                continue;
            }
            match members {
                Some(members) => pending.push((bounds, members)),
                None => {
                    if let Some(handle) = handles[idx].take() {
                        standalone.push(StandaloneEntry { handle, bounds });
                    }
                }
            }
        }
        for (bounds, members) in pending {
            let member_handles = members
                .into_iter()
                .filter_map(|member| handles[member].take())
                .collect();
            clusters.push(ClusterEntry {
                bounds,
                handles: member_handles,
            });
        }

        ClusterPartition {
            standalone,
            clusters,
        }
    }
}
