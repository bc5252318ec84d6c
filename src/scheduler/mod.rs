pub mod clock;
pub mod scheduler;

pub use clock::*;
pub use scheduler::*;
