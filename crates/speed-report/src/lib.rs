pub mod action;
pub mod error;
pub mod source;
pub mod window;

pub use action::{ReportAction, register_reports};
pub use error::ReportError;
pub use source::{HttpReportSource, ReportSource, StubReportSource};
pub use window::ReportWindow;
