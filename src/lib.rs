pub mod parameters;
pub mod sim;
