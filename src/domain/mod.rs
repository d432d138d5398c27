pub mod error;
pub mod member;
pub mod paper;
