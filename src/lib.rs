pub mod busy;
pub mod cli;
pub mod collector;
pub mod error;
pub mod gocov;
pub mod locate;
pub mod model;
pub mod offset;
pub mod render;
pub mod session;
pub mod sort;
pub mod term;
pub mod viewer;
