pub mod bwt;
pub mod sa;
