pub mod handlers;
pub mod manager;
pub mod server;
pub mod state;

pub use manager::Manager;
pub use server::{router, run_server};
pub use state::{AppState, AskError, AskRequest, ManagerCommand};
