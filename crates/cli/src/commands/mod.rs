pub mod ask;
pub mod doctor;
pub mod documents;
pub mod history;
pub mod ingest;
pub mod upload;
