//! Data models for the conversion workflow
//!
//! Files going in, parameters travelling with them, results coming out, and
//! the declarative description of each tool.

mod file;
mod params;
mod result;
mod tool;

pub use file::{content_type_for_extension, content_type_for_filename, CandidateFile, SelectedFile};
pub use params::{value_as_form_text, ConversionParameters, UpscaleFactor};
pub use result::{BatchOutcome, ConversionResult, FailedItem};
pub use tool::{
    DispatchStrategy, ParamBinding, ParamKey, PayloadEncoding, Requirement, ResponseKind,
    ToolCategory, ToolSpec,
};
