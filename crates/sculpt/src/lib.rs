pub mod batch;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod profile;
pub mod prompt_template;
pub mod providers;
pub mod tools;
pub mod translate;
pub mod utils;
