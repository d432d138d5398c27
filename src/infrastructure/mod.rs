pub mod biorxiv;
pub mod config;
pub mod db;
