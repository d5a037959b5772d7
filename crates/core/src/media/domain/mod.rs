pub mod frame_reader;
pub mod image_writer;
pub mod report_store;
