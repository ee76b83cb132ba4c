pub mod extractor;
pub mod model;
pub mod schema;
pub mod sheets;
pub mod task;
