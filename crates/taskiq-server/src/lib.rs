//! taskiq-server: HTTP gateway for the task dependency subsystem.

pub mod api;
pub mod config;
