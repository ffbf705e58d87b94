#![doc = include_str!("../README.md")]
#![warn(
    missing_docs,
    clippy::missing_errors_doc,
    clippy::missing_docs_in_private_items,
    clippy::missing_panics_doc,
)]

pub mod action;
pub mod app;
pub mod binning;
pub mod cache;
pub mod graphics;
pub mod inputs;
pub mod jobs;
pub mod math;
pub mod mesh;
pub mod orchestrator;
pub mod raster;
pub mod resources;
pub mod scene;
pub mod tile;
