//! Synchronizes Daggerheart rules text from the bilingual API cache into the Foundry
//! translation files of the Russian localization module.

pub mod config;
pub mod error;
pub mod lookup;
pub mod merge;
pub mod model;
pub mod services;
pub mod splitter;
pub mod text;
pub mod updaters;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use services::pipeline::{run, run_with_sources};
pub use services::report::RunReport;
