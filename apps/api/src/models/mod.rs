//! Records stored in the hosted database
//!
//! Each model deserializes from the JSON row returned by the REST API and
//! serializes back unchanged in API responses. `New*` types are the insert
//! payloads.

pub mod reset_code;
pub mod sound;
pub mod survey;
pub mod user;

pub use reset_code::{NewPasswordResetCode, PasswordResetCode};
pub use sound::{NewSound, NewSoundProfile, Sound, SoundProfile};
pub use survey::{NewSurveyParticipant, SurveyParticipant};
pub use user::{User, UserRole};
