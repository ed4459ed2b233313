mod health_check;
mod session;

pub use health_check::health_check;
pub use session::{login, logout, me, refresh};
pub use session::{AccountResponse, LoginRequest, LoginResponse, MessageResponse, RefreshRequest};
