pub mod bluetooth;
pub mod input;
pub mod logging;
