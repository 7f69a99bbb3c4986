pub mod aggregate;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod listing;
pub mod output;
pub mod profile;
pub mod s3;
pub mod store;
pub mod table;
pub mod task;
pub mod versions;
