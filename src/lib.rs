pub mod collect;
pub mod ops;
pub mod protocol;
pub mod tools;
pub mod transport;

mod app;
pub mod commands;
pub mod config;

// Re-export the main entry points
pub use app::App;
pub use commands::publish::PublishRequest;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
