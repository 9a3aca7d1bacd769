use crate::error::LayoutError;
use crate::geometry::{Mbr, Point};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// On-screen size of the marker drawn for a cluster, before scaling.
    pub marker_size: Point,
    /// Screen density factor applied to `marker_size`.
    pub resolution_scale: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            marker_size: (32.0, 32.0),
            resolution_scale: 1.0,
        }
    }
}

impl ClusterConfig {
    pub fn scaled_marker_size(&self) -> Point {
        (
            self.marker_size.0 * self.resolution_scale,
            self.marker_size.1 * self.resolution_scale,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub viewport: Mbr,
    pub overlap_grid: (usize, usize),
    pub cluster_grid: (usize, usize),
    pub cluster: ClusterConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport: Mbr::new((0.0, 0.0), (1200.0, 800.0)),
            overlap_grid: (20, 10),
            cluster_grid: (64, 64),
            cluster: ClusterConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.viewport.is_degenerate() {
            return Err(LayoutError::InvalidConfig(format!(
                "viewport must have positive finite area, got {:?}..{:?}",
                self.viewport.ll, self.viewport.ur
            )));
        }
        for (name, (x, y)) in [
            ("overlapGrid", self.overlap_grid),
            ("clusterGrid", self.cluster_grid),
        ] {
            if x == 0 || y == 0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "{name} needs at least one cell per axis, got {x}x{y}"
                )));
            }
        }
        let (mw, mh) = self.cluster.marker_size;
        if !(mw.is_finite() && mh.is_finite() && mw >= 0.0 && mh >= 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "clusterMarkerSize must be non-negative, got {mw}x{mh}"
            )));
        }
        let scale = self.cluster.resolution_scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "resolutionScale must be positive, got {scale}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    viewport: Option<[f32; 4]>,
    overlap_grid: Option<[usize; 2]>,
    cluster_grid: Option<[usize; 2]>,
    cluster_marker_size: Option<[f32; 2]>,
    resolution_scale: Option<f32>,
}

fn parse_config_file(contents: &str) -> anyhow::Result<ConfigFile> {
    match serde_json::from_str::<ConfigFile>(contents) {
        Ok(parsed) => Ok(parsed),
        Err(json_err) => json5::from_str::<ConfigFile>(contents)
            .map_err(|_| anyhow::anyhow!("failed to parse config: {json_err}")),
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed = parse_config_file(&contents)?;

    if let Some([x0, y0, x1, y1]) = parsed.viewport {
        config.viewport = Mbr::new((x0, y0), (x1, y1));
    }
    if let Some([x, y]) = parsed.overlap_grid {
        config.overlap_grid = (x, y);
    }
    if let Some([x, y]) = parsed.cluster_grid {
        config.cluster_grid = (x, y);
    }
    if let Some([w, h]) = parsed.cluster_marker_size {
        config.cluster.marker_size = (w, h);
    }
    if let Some(v) = parsed.resolution_scale {
        config.cluster.resolution_scale = v;
    }

    config.validate()?;
    Ok(config)
}
