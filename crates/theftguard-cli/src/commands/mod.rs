pub mod check;
pub mod config;
pub mod places;
pub mod run;
