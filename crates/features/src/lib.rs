//! Feature engine: merge normalized tables, derive modelling features,
//! fit and apply transforms, and assemble per-target design matrices.

pub mod dataset;
pub mod derive;
pub mod merge;
pub mod transform;

pub use dataset::{
    build_inference_matrix, build_training_matrix, split_by_time, wind_speed_pairs, FeatureMatrix,
    TargetKind,
};
pub use derive::engineer_features;
pub use merge::{join_weather, merge_with_energy};
pub use transform::{CategoryEncoder, ScalePcaPipeline, TransformArtifacts};
