pub mod checkin_repository;
pub mod directory_repository;
pub mod identity_repository;
pub mod mock_db;
pub mod postgres_checkin_repository;
pub mod postgres_directory_repository;
pub mod postgres_identity_repository;
pub mod postgres_preference_repository;
pub mod postgres_whisper_repository;
pub mod preference_repository;
pub mod schema;
pub mod whisper_repository;
