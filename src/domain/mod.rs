pub mod analysis;
pub mod company;

pub use analysis::*;
pub use company::*;
