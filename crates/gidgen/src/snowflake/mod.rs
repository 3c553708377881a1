mod config;
mod node;

pub use config::*;
pub use node::*;
