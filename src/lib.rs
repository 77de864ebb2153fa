// Library exports for farechart

pub mod aggregate;
pub mod align;
pub mod charts;
pub mod config;
pub mod data;
pub mod decode;
pub mod ir;
pub mod palette;
pub mod parser;
pub mod pivot;
pub mod rank;
pub mod sample;
pub mod summary;

pub use config::DashboardConfig;
pub use data::{CategoryField, Field, Record};
pub use palette::ColorTable;
pub use decode::{CategoryMapping, CategoryMappings};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartOptions {
    /// Entries kept at each end of a ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Values drawn per group for distribution and scatter charts.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_top_n() -> usize { 10 }
fn default_sample_size() -> usize { 500 }

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            sample_size: default_sample_size(),
            seed: None,
        }
    }
}
