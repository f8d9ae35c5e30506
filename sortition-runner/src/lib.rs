//! Sortition Runner: loading, search orchestration, reporting and export.
//!
//! This crate builds on `sortition-core` to provide:
//! - TOML run configuration with defaults for the reference run
//! - CSV loading of the population profile and the record lists
//! - Sample search, sequential or on a rayon pool, with progress callbacks
//! - Population vs. sample representation tables
//! - JSON/CSV/Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod report;
pub mod runner;
pub mod search;

pub use config::{ConfigError, InputPaths, OutputConfig, SelectionConfig, SelectionParams};
pub use data_loader::{
    load_inputs, load_optional_table, load_profile, load_table, read_profile_rows, read_table,
    LoadError, LoadedInputs,
};
pub use export::{
    generate_report, load_manifest, save_artifacts, MemberSource, SelectionManifest,
    SCHEMA_VERSION,
};
pub use report::{CategoryRepresentation, RepresentationReport, VariableRepresentation};
pub use runner::{
    prepare, run_selection, run_selection_from_inputs, score_panel, PanelScore, PreparedRun,
    RunError, SelectionRun,
};
pub use search::{search, SampleSearch, SearchConfig, SearchError, SearchOutcome, SearchProgress};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SelectionConfig>();
        assert_sync::<SelectionConfig>();
        assert_send::<SearchConfig>();
        assert_sync::<SearchConfig>();
    }

    #[test]
    fn search_types_are_send_sync() {
        assert_send::<SearchProgress>();
        assert_sync::<SearchProgress>();
        assert_send::<SearchOutcome>();
        assert_sync::<SearchOutcome>();
        assert_sync::<SampleSearch<'static>>();
    }

    #[test]
    fn run_results_are_send_sync() {
        assert_send::<SelectionRun>();
        assert_sync::<SelectionRun>();
        assert_send::<PreparedRun>();
        assert_sync::<PreparedRun>();
        assert_send::<RepresentationReport>();
        assert_sync::<RepresentationReport>();
        assert_send::<SelectionManifest>();
        assert_sync::<SelectionManifest>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }
}
