#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::cargo_common_metadata,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod app;
pub mod cli;
pub mod config;
pub mod form;
pub mod list;
pub mod map;
pub mod storage;
pub mod terminal;
pub mod types;
pub mod utils;
