//! Data access layer for Soundbank
//!
//! Each repository wraps the backend `Database` trait for one table and
//! turns JSON rows into typed records, so services and middleware never
//! build queries by hand.

pub mod reset_code;
pub mod sound;
pub mod sound_profile;
pub mod survey;
pub mod user;
pub mod utils;

pub use reset_code::ResetCodeRepository;
pub use sound::SoundRepository;
pub use sound_profile::SoundProfileRepository;
pub use survey::SurveyRepository;
pub use user::UserRepository;
