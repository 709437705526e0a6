pub mod atlas;
pub mod config;
pub mod matrix;
pub mod result;
