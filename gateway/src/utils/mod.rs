pub mod security;
pub mod time;

pub use security::*;
pub use time::*;
