//! Core type definitions for batch radiomics extraction
//!
//! This module provides the value types shared by every stage of a run:
//! - [`FilterCategory`]: Image derivation filters (Original, Wavelet, LoG, ...)
//! - [`FilterSelection`]: The enabled subset, or all of them
//! - [`RawParameters`]: Unvalidated text input from a form or command line
//! - [`ExtractionConfig`]: Validated, immutable settings for one run
//! - [`CasePair`]: One image/mask pair

mod config;
mod filter;
mod pair;
pub mod values;

pub use config::{ConfigBuilder, ExtractionConfig, RawParameters, SIGMA_COUNT, SPACING_AXES};
pub use filter::{FilterCategory, FilterSelection};
pub use pair::CasePair;
