pub mod tophat_light_detector;
