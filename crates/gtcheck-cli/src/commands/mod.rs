pub mod check;
pub mod parse_call;
pub mod registries;
