mod buffered;
mod error;
mod raw_id;
mod snowflake;
mod time;

pub use crate::buffered::*;
pub use crate::error::*;
pub use crate::raw_id::*;
pub use crate::snowflake::*;
pub use crate::time::*;
