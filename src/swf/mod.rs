pub mod avm1;
pub mod file;
pub mod place;
pub mod tags;
pub mod types;
