pub mod logging;
pub mod request_id;
pub mod signature;

pub use logging::*;
pub use request_id::*;
pub use signature::*;
