pub mod cache;
pub mod encoding;
pub mod fetch;
pub mod pipeline;
pub mod report;
pub mod store;
