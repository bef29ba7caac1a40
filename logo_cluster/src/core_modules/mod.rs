pub mod clusterer;
pub mod domain;
pub mod fingerprint;
pub mod fingerprint_engine;
pub mod fingerprint_table;
pub mod pixel_grid;
pub mod utils;
