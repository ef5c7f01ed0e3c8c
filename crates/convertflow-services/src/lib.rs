//! Convertflow Services
//!
//! Batch conversion orchestration on top of the API client and blob store:
//! file intake, sequential dispatch, result aggregation, concurrent ZIP
//! packaging and downloads, tied together by [`Workbench`].

pub mod aggregate;
pub mod archive;
pub mod dispatch;
pub mod download;
pub mod intake;
pub mod session;

#[cfg(test)]
mod testing;

pub use aggregate::{summarize, Notification, NotificationLevel, ResultAggregator};
pub use archive::{unique_entry_names, ArchivePackager};
pub use dispatch::Dispatcher;
pub use download::DownloadTrigger;
pub use intake::{
    release_previews, Admission, FileIntake, IntakePolicy, IntakeReport, Rejection, SelectionMode,
};
pub use session::{Workbench, WorkbenchState};
