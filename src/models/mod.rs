pub mod aggregate;
pub mod data_models;
pub mod filter;

pub use aggregate::*;
pub use data_models::*;
pub use filter::*;
