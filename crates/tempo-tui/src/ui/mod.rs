//! UI rendering components.

pub mod chat;
pub mod input;
mod layout;
pub mod logs;
pub mod steps;

pub use layout::render;
