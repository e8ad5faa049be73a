// Domain layer: billing models and ports (interfaces). No I/O here.

pub mod model;
pub mod money;
pub mod month;
pub mod ports;
pub mod report;
