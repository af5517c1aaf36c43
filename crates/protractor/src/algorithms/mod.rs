pub mod preprocessing;
pub mod extraction;
pub mod selection;
pub mod simplification;
pub mod filtering;
pub mod angle;

pub use preprocessing::*;
pub use extraction::*;
pub use selection::*;
pub use simplification::*;
pub use filtering::*;
pub use angle::*;
