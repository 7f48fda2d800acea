#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The overlay applier (spec §4.9): strategic-merge-patches rendered
//! proxy workload manifests and synthesizes auxiliary objects
//! (PodDisruptionBudget, HorizontalPodAutoscaler, VerticalPodAutoscaler)
//! when an overlay for them is configured.

pub mod apply;
pub mod merge;
pub mod synth;

pub use apply::{apply_all, apply_overlay, is_known_kind};
pub use merge::{shallow_merge_labels, strategic_merge};
pub use synth::{synthesize_auxiliaries, synthesize_hpa, synthesize_pdb, synthesize_vpa};
