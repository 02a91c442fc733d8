pub mod claims;
pub mod login;
pub mod session;

pub use login::{handle_logout, handle_me, handle_session_login};
