pub mod gutendex;
pub mod json_store;
