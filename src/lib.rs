pub mod advisor;
pub mod airlines;
pub mod alternatives;
pub mod audience;
pub mod config;
pub mod context;
pub mod drivers;
pub mod engine;
pub mod lodging;
pub mod output;
pub mod resolver;
