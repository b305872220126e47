pub mod action_executor;
pub mod animation;
pub mod backend;
pub mod config;
pub mod console;
pub mod discovery;
pub mod instruction;
pub mod logging;
pub mod model;
pub mod registry;
pub mod runtime;
pub mod safety;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod shell;
pub mod transcript;
