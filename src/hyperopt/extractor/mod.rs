pub mod labels;
pub mod show_output;
