pub mod cluster;
pub mod pskreporter;
pub mod scheduled;
