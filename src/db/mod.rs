// Database module
// This module handles SQLite storage for the audio cache

pub mod connection;
pub mod migrations;
pub mod models;
pub mod operations;
