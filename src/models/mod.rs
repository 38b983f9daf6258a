mod design;
mod nodes;

pub use design::*;
pub use nodes::*;
