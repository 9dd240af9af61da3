pub mod fixture;
pub mod session_file;
pub mod tree;
