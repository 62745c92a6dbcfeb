pub mod validation;
pub mod weeks;
