//! Config file I/O.

mod loader;
mod template;

#[cfg(test)]
mod tests;

pub use loader::{default_config_path, load_default, load_from_path, write_default_config};
