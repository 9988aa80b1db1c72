pub mod config;
pub mod fetcher;
pub mod loader;
pub mod metadata;
pub mod pipeline;
pub mod rarity;
pub mod report;
pub mod traits;
