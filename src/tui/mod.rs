//! TUI module for terminal user interfaces

mod board;

pub use board::ProxyBoardApp;
