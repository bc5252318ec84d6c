pub mod camera;
pub mod source;
pub mod test_pattern;

pub use camera::*;
pub use source::*;
pub use test_pattern::*;
