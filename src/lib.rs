#[cfg(feature = "cli")]
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod ir;
pub mod layout_dump;
pub mod overlap;
pub mod pass;

#[cfg(feature = "cli")]
pub use cli::run;
pub use cluster::{ClusterBuilder, ClusterPartition, Resolution};
pub use config::{ClusterConfig, LayoutConfig, load_config};
pub use error::LayoutError;
pub use geometry::{Mbr, Point};
pub use ir::{Annotation, Placement, Scene, load_scene, parse_scene};
pub use overlap::OverlapTracker;
pub use pass::{ClusterLayout, LayoutResult, compute_layout};
