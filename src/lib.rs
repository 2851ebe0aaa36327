pub mod aggregate;
pub mod app;
pub mod cache;
pub mod config;
pub mod cpsc;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod fda;
pub mod normalize;
pub mod output;
pub mod stats;
pub mod upstream;
