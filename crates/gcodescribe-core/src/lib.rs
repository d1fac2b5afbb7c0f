//! # gcodescribe Core
//!
//! Core types shared by the gcodescribe crates:
//! the error taxonomy, recoverable diagnostics, and the command mapping
//! provider consumed by the line translator.

pub mod error;
pub mod mapping;

pub use error::{Diagnostic, Error, MappingError, Result, TranslateError};
pub use mapping::{
    expand_command_range, CommandLookup, CommandMapping, FirmwareFlavor, MARLIN_MAPPING_FILE,
};
