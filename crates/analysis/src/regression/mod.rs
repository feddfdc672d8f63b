pub mod geodesic;
pub mod least_squares;
mod pls;

pub use pls::*;
