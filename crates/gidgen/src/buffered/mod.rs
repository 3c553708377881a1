mod collaborator;
mod config;
mod generator;
mod record;
mod worker;

pub use collaborator::*;
pub use config::*;
pub use generator::*;
pub use record::*;
