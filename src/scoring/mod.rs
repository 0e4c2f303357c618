pub mod letters;
pub mod mistakes;
pub mod per;
pub mod tips;
