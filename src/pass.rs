use crate::cluster::{ClusterBuilder, Resolution};
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::geometry::{Mbr, Point};
use crate::ir::{Placement, Scene};
use crate::overlap::OverlapTracker;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use tracing::{debug, info_span, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterLayout {
    pub group: i64,
    pub center: Point,
    pub mbr: Mbr,
    /// Footprint of the representative marker.
    pub marker: Vec<Point>,
    /// Member annotation ids, most important first.
    pub members: Vec<String>,
}

/// Decisions for one layout pass, ready for the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub visible: Vec<String>,
    pub hidden: Vec<String>,
    pub clusters: Vec<ClusterLayout>,
}

impl LayoutResult {
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.iter().any(|v| v == id)
    }

    pub fn cluster_of(&self, id: &str) -> Option<&ClusterLayout> {
        self.clusters
            .iter()
            .find(|cluster| cluster.members.iter().any(|m| m == id))
    }
}

/// Run one layout pass over `scene`.
///
/// Annotations are handled by descending importance (ties keep scene
/// order). Clusterable ones are grouped per cluster group first; then the
/// forced annotations, the cluster markers, and finally every remaining
/// annotation are placed on screen, the last group only where they fit.
///
/// Returns [`LayoutError::Cancelled`] if `cancel` is raised while clusters
/// are being reconciled; nothing of the pass survives in that case.
pub fn compute_layout(
    scene: &Scene,
    config: &LayoutConfig,
    cancel: &AtomicBool,
) -> Result<LayoutResult, LayoutError> {
    config.validate()?;
    let annotations = &scene.annotations;
    let _span = info_span!("layout_pass", annotations = annotations.len()).entered();

    let mut order: Vec<usize> = (0..annotations.len()).collect();
    order.sort_by(|&a, &b| {
        annotations[b]
            .importance
            .total_cmp(&annotations[a].importance)
    });

    let (cluster_x, cluster_y) = config.cluster_grid;
    let mut builders: BTreeMap<i64, ClusterBuilder<usize>> = BTreeMap::new();
    for &idx in &order {
        let annotation = &annotations[idx];
        if annotation.placement == Placement::Forced {
            continue;
        }
        if let Some(group) = annotation.cluster_group {
            builders
                .entry(group)
                .or_insert_with(|| {
                    ClusterBuilder::new(config.viewport, cluster_x, cluster_y, &config.cluster)
                })
                .add_object(idx, &annotation.footprint);
        }
    }

    let mut clusters = Vec::new();
    let mut clustered = vec![false; annotations.len()];
    for (group, mut builder) in builders {
        if let Resolution::Cancelled { merges } = builder.resolve_clusters(cancel) {
            debug!(group, merges, "dropping cancelled layout pass");
            return Err(LayoutError::Cancelled);
        }
        let partition = builder.into_partition();
        for cluster in partition.clusters {
            for &member in &cluster.handles {
                clustered[member] = true;
            }
            clusters.push(ClusterLayout {
                group,
                center: cluster.bounds.center,
                mbr: cluster.bounds.mbr,
                marker: cluster.bounds.pts,
                members: cluster
                    .handles
                    .iter()
                    .map(|&member| annotations[member].id.clone())
                    .collect(),
            });
        }
    }

    let (overlap_x, overlap_y) = config.overlap_grid;
    let mut tracker = OverlapTracker::new(config.viewport, overlap_x, overlap_y);
    let mut visible = Vec::new();
    let mut hidden = Vec::new();

    for &idx in &order {
        let annotation = &annotations[idx];
        if annotation.placement == Placement::Forced {
            tracker.add_object(&annotation.footprint);
            visible.push(annotation.id.clone());
        }
    }
    for cluster in &clusters {
        tracker.add_object(&cluster.marker);
    }
    for &idx in &order {
        let annotation = &annotations[idx];
        if annotation.placement == Placement::Forced || clustered[idx] {
            continue;
        }
        if tracker.add_check_object(&annotation.footprint) {
            visible.push(annotation.id.clone());
        } else {
            trace!(id = %annotation.id, "hidden by overlap");
            hidden.push(annotation.id.clone());
        }
    }

    debug!(
        visible = visible.len(),
        hidden = hidden.len(),
        clusters = clusters.len(),
        "layout pass complete"
    );
    Ok(LayoutResult {
        visible,
        hidden,
        clusters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;
    use crate::ir::Annotation;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point> {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }

    fn label(id: &str, footprint: Vec<Point>, importance: f32) -> Annotation {
        Annotation {
            id: id.to_string(),
            footprint,
            importance,
            placement: Placement::Checked,
            cluster_group: None,
        }
    }

    fn config() -> LayoutConfig {
        LayoutConfig {
            viewport: Mbr::new((0.0, 0.0), (100.0, 100.0)),
            overlap_grid: (10, 10),
            cluster_grid: (10, 10),
            cluster: ClusterConfig {
                marker_size: (10.0, 10.0),
                resolution_scale: 1.0,
            },
        }
    }

    #[test]
    fn importance_decides_who_wins_an_overlap() {
        let scene = Scene {
            annotations: vec![
                label("low", square(10.0, 10.0, 20.0, 20.0), 1.0),
                label("high", square(15.0, 15.0, 25.0, 25.0), 5.0),
                label("free", square(50.0, 50.0, 60.0, 60.0), 0.0),
            ],
        };
        let result = compute_layout(&scene, &config(), &AtomicBool::new(false))
            .expect("layout should succeed");
        assert_eq!(result.visible, vec!["high", "free"]);
        assert_eq!(result.hidden, vec!["low"]);
        assert!(result.clusters.is_empty());
    }

    #[test]
    fn forced_annotations_always_show_and_block_others() {
        let mut forced = label("badge", square(10.0, 10.0, 30.0, 30.0), 0.0);
        forced.placement = Placement::Forced;
        let scene = Scene {
            annotations: vec![
                label("label", square(20.0, 20.0, 40.0, 40.0), 9.0),
                forced,
            ],
        };
        let result = compute_layout(&scene, &config(), &AtomicBool::new(false))
            .expect("layout should succeed");
        assert_eq!(result.visible, vec!["badge"]);
        assert_eq!(result.hidden, vec!["label"]);
    }

    #[test]
    fn clusters_are_formed_per_group() {
        let mut annotations = Vec::new();
        for (i, x) in [10.0f32, 14.0, 18.0].iter().enumerate() {
            let mut a = label(&format!("g1-{i}"), square(x - 1.0, 9.0, x + 1.0, 11.0), 1.0);
            a.cluster_group = Some(1);
            annotations.push(a);
        }
        // Same place, other group: clusters separately.
        for (i, x) in [10.0f32, 14.0].iter().enumerate() {
            let mut a = label(&format!("g2-{i}"), square(x - 1.0, 79.0, x + 1.0, 81.0), 1.0);
            a.cluster_group = Some(2);
            annotations.push(a);
        }
        let mut lone = label("lone", square(79.0, 79.0, 81.0, 81.0), 1.0);
        lone.cluster_group = Some(1);
        annotations.push(lone);

        let scene = Scene { annotations };
        let result = compute_layout(&scene, &config(), &AtomicBool::new(false))
            .expect("layout should succeed");
        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.clusters[0].group, 1);
        assert_eq!(result.clusters[0].members, vec!["g1-0", "g1-1", "g1-2"]);
        assert_eq!(result.clusters[1].group, 2);
        assert_eq!(result.clusters[1].members, vec!["g2-0", "g2-1"]);
        assert_eq!(result.visible, vec!["lone"]);
        assert!(result.cluster_of("g1-2").is_some());
        assert!(!result.is_visible("g1-0"));
    }

    #[test]
    fn cancelled_pass_returns_error() {
        let mut annotations = Vec::new();
        for (i, x) in [10.0f32, 14.0].iter().enumerate() {
            let mut a = label(&format!("c{i}"), square(x - 1.0, 9.0, x + 1.0, 11.0), 1.0);
            a.cluster_group = Some(0);
            annotations.push(a);
        }
        let scene = Scene { annotations };
        let err = compute_layout(&scene, &config(), &AtomicBool::new(true))
            .expect_err("pass should be cancelled");
        assert_eq!(err, LayoutError::Cancelled);
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut config = config();
        config.overlap_grid = (0, 0);
        let err = compute_layout(&Scene::default(), &config, &AtomicBool::new(false))
            .expect_err("config should be rejected");
        assert!(matches!(err, LayoutError::InvalidConfig(_)));
    }
}
