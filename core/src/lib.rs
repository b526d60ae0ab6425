pub mod catalog;
pub mod db;
pub mod error;
pub mod merge;
pub mod missing;
pub mod models;
pub mod mutator;
pub mod notify;
pub mod overlay;
pub mod pantry;
pub mod service;
pub mod storage;
