use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Shown only if it does not overlap anything placed before it.
    #[default]
    Checked,
    /// Always shown; still blocks later annotations.
    Forced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub footprint: Vec<Point>,
    #[serde(default)]
    pub importance: f32,
    #[serde(default)]
    pub placement: Placement,
    /// Annotations sharing a group id may be collapsed into one marker.
    /// Forced annotations are never clustered.
    #[serde(default)]
    pub cluster_group: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    pub annotations: Vec<Annotation>,
}

pub fn parse_scene(input: &str) -> anyhow::Result<Scene> {
    let scene: Scene = serde_json::from_str(input)?;
    if let Some(bad) = scene.annotations.iter().find(|a| a.footprint.is_empty()) {
        return Err(anyhow::anyhow!(
            "annotation '{}' has an empty footprint",
            bad.id
        ));
    }
    Ok(scene)
}

/// Read a scene from `path`, or from stdin when `path` is `None` or `-`.
pub fn load_scene(path: Option<&Path>) -> anyhow::Result<Scene> {
    let input = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)?,
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    parse_scene(&input)
}
