pub mod parameters;

pub use parameters::{Parameter, ParameterMap, ParameterTree, ParameterValue};
