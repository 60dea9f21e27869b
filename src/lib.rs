pub mod agent;
pub mod config;
pub mod pipeline;
pub mod segmenter;
pub mod tools;
