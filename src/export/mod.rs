//! Output documents and the JSON report

pub mod document;
pub mod json;

pub use document::{AnalysisDocument, AnalyticFields};
pub use json::{read_report, write_report, ClipReport, LatidoReport};
