pub mod User_species;
pub mod process_stream;
