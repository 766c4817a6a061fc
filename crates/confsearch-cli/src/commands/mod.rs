pub mod defaults;
pub mod search;
