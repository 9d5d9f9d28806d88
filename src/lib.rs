pub mod app;
pub mod assemble;
pub mod coldata;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod loader;
pub mod matrix;
pub mod output;
pub mod summary;
pub mod table;
