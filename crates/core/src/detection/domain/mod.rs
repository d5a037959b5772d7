pub mod background_suppressor;
pub mod blob_segmenter;
pub mod candidate_filter;
pub mod detection_config;
pub mod light_detector;
