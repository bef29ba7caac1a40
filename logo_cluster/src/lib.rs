// THEORY:
// This file is the main entry point for the `logo_cluster` library crate. It
// exposes the two pieces with real algorithmic content, the perceptual
// `FingerprintEngine` and the anchor-based `SimilarityClusterer`, together with
// the batch orchestration that feeds them (`pipeline`, `parallel_pipeline`).
//
// Everything that touches the outside world (reading the domain list, fetching
// logos, writing the result) sits behind small traits in `domain_list`,
// `sources` and `result_sink`, so the core never depends on a particular file
// format or HTTP provider.

pub mod core_modules;
pub mod domain_list;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod result_sink;
pub mod sources;

pub use core_modules::clusterer::{ClusterConfig, Group, Partition, SimilarityClusterer};
pub use core_modules::domain::Domain;
pub use core_modules::fingerprint::Fingerprint;
pub use core_modules::fingerprint_engine::{FingerprintConfig, FingerprintEngine};
pub use core_modules::fingerprint_table::FingerprintTable;
pub use core_modules::pixel_grid::pixel_grid::PixelGrid;
pub use error::{Error, Result};
