// Domain layer: the models callers exchange with the adapter and the port it implements.

pub mod model;
pub mod ports;
