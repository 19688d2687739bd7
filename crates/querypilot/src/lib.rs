pub mod agent;
pub mod credentials;
pub mod debug_log;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod progress;
pub mod prompt_template;
pub mod providers;
pub mod query;
