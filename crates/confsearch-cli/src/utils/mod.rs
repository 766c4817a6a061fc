pub mod parser;
pub mod paths;
pub mod progress;
