pub mod batch;
pub mod cli;
pub mod engine;
pub mod error;
pub mod export;
pub mod extraction;
pub mod pairing;
pub mod table;
pub mod types;

pub use batch::{BatchRunner, CaseReporter, LogReporter};
pub use cli::report::TextReport;
pub use engine::{EngineFactory, FeatureEngine, FeatureVector, NativeEngineFactory, Volume};
pub use error::{EngineError, RadiobatchError, Result};
pub use export::{write_export, ExportSink, XlsxSink};
pub use extraction::{CaseExtractor, EngineAdapter};
pub use pairing::{pair_cases, pair_cases_with, PairingPolicy};
pub use table::{Cell, FeatureRow, ResultTable, TableBuilder};
pub use types::*;

#[cfg(feature = "json")]
pub use export::JsonSink;
