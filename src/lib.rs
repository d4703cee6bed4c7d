pub mod adapters;
pub mod config;
pub mod divisions;
pub mod error;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod winners;
