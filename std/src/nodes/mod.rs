pub mod choice;
pub mod debug;
pub mod flow;
pub mod logic;
pub mod retry;
pub mod session;
