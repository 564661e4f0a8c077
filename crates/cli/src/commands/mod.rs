pub mod cluster;
pub mod service;
