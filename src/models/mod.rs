pub mod checkin;
pub mod directory;
pub mod selection;
pub mod user;
pub mod whisper;
