#[macro_use]
pub mod utils;

pub mod config;
pub mod console;
pub mod debugger;
