pub mod logging;
pub mod panic;
pub mod wait;
