pub mod field_map;
pub mod results_sheet;
pub mod run_result;
pub mod run_spec;
