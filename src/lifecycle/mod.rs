pub mod guest;
mod resolution;
pub mod virtual_machine;
