pub mod meta;
pub mod tools;
