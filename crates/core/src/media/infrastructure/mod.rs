pub mod image_dir_reader;
pub mod image_file_writer;
pub mod json_report_store;
