pub mod resolve;
pub mod setup;
pub mod ui;
