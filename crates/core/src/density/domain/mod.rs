pub mod accumulation_surface;
pub mod cluster_config;
pub mod cluster_segmenter;
pub mod composite;
pub mod contrast_normalizer;
pub mod heatmap_config;
