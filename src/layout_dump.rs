use crate::pass::LayoutResult;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub visible_count: usize,
    pub hidden_count: usize,
    pub cluster_count: usize,
    pub visible: Vec<String>,
    pub hidden: Vec<String>,
    pub clusters: Vec<ClusterDump>,
}

#[derive(Debug, Serialize)]
pub struct ClusterDump {
    pub group: i64,
    pub center: [f32; 2],
    pub mbr: [f32; 4],
    pub marker: Vec<[f32; 2]>,
    pub members: Vec<String>,
}

impl LayoutDump {
    pub fn from_result(result: &LayoutResult) -> Self {
        let clusters = result
            .clusters
            .iter()
            .map(|cluster| ClusterDump {
                group: cluster.group,
                center: [cluster.center.0, cluster.center.1],
                mbr: [
                    cluster.mbr.ll.0,
                    cluster.mbr.ll.1,
                    cluster.mbr.ur.0,
                    cluster.mbr.ur.1,
                ],
                marker: cluster.marker.iter().map(|(x, y)| [*x, *y]).collect(),
                members: cluster.members.clone(),
            })
            .collect();

        LayoutDump {
            visible_count: result.visible.len(),
            hidden_count: result.hidden.len(),
            cluster_count: result.clusters.len(),
            visible: result.visible.clone(),
            hidden: result.hidden.clone(),
            clusters,
        }
    }
}

/// Write the pass result as pretty JSON to `path`, or to stdout when no
/// path is given.
pub fn write_layout_dump(path: Option<&Path>, result: &LayoutResult) -> anyhow::Result<()> {
    let dump = LayoutDump::from_result(result);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mbr;
    use crate::pass::ClusterLayout;

    #[test]
    fn dump_flattens_cluster_geometry() {
        let result = LayoutResult {
            visible: vec!["a".into()],
            hidden: vec!["b".into(), "c".into()],
            clusters: vec![ClusterLayout {
                group: 3,
                center: (5.0, 6.0),
                mbr: Mbr::new((1.0, 2.0), (9.0, 10.0)),
                marker: vec![(0.0, 1.0), (2.0, 1.0)],
                members: vec!["d".into(), "e".into()],
            }],
        };
        let value = serde_json::to_value(LayoutDump::from_result(&result)).expect("serialize");
        assert_eq!(value["visibleCount"], 1);
        assert_eq!(value["hiddenCount"], 2);
        assert_eq!(value["clusterCount"], 1);
        assert_eq!(value["clusters"][0]["mbr"], serde_json::json!([1.0, 2.0, 9.0, 10.0]));
        assert_eq!(value["clusters"][0]["members"], serde_json::json!(["d", "e"]));
    }
}
