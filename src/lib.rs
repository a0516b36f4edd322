pub mod cluster;
pub mod config;
pub mod globals;
pub mod helpers;
pub mod log;
pub mod pid;
pub mod process;
pub mod setup;
pub mod supervisor;
