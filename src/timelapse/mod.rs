pub mod accumulator;
pub mod encoder;

pub use accumulator::*;
pub use encoder::*;
