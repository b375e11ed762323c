pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod decide;
pub mod delete;
pub mod edit;
pub mod list;
pub mod pending;
pub mod submit;
pub mod watch;
