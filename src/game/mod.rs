pub mod chess;
pub mod rules;
pub mod session;
pub mod session_store;
