pub mod config;
pub mod density;
pub mod detection;
pub mod imaging;
pub mod media;
pub mod pipeline;
pub mod shared;
