mod construct_unit;
mod intersect_ports;

pub use construct_unit::ConstructUnit;
pub use intersect_ports::IntersectPorts;
