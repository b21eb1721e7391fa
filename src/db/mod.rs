// Database module
// This module handles SQLite persistence of client state and the content library

pub mod connection;
pub mod migrations;
pub mod models;
pub mod operations;
