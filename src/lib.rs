//! # IFC Pset Sync
//!
//! Writes pipe dimensions from an attribute spreadsheet into an IFC model.
//!
//! ## Features
//!
//! - Parse and re-emit IFC (STEP) files, leaving untouched entities verbatim
//! - Match sheet rows to pipe components by name and GlobalId
//! - Create or update `PipeLength` / `PipeDiameter` in `Pset_PipeProperties`
//! - Normalize header text through CP1251 for the target viewer
//! - Carry GlobalIds over from a previous export of the same model
//!
//! ## Example
//!
//! ```no_run
//! use ifc_pset_sync::config::SyncOptions;
//! use ifc_pset_sync::pipeline::convert_excel_to_ifc;
//!
//! let report = convert_excel_to_ifc(
//!     "model.ifc",
//!     "attributes.xlsx",
//!     "model_updated.ifc",
//!     &SyncOptions::default(),
//! )
//! .expect("Failed to convert");
//! println!("Matched: {}", report.matched);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod header_fix;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod sheet;
pub mod sync;
