pub mod sheet_client;
pub mod worksheet;
