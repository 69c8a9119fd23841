//! CLI command implementations, one module per subcommand.

mod cache;
mod query;
mod route;
mod top5;

pub use cache::clear_cache;
pub use query::{query, shell};
pub use route::route;
pub use top5::{top5, Granularity};

#[cfg(test)]
mod tests;
