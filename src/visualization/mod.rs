//! Visualization and plotting

pub mod histogram;

pub use histogram::HistogramPlotter;
