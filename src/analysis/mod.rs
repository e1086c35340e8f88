mod handler;
mod record_store;

pub use handler::AnalysisHandler;
pub use record_store::{AnalysisRecord, AnalysisRecordStore, AnalysisStatus, CompletedAnalysis};
