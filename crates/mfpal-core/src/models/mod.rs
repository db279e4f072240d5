//! Data models for identity-service entities.
//!
//! - `User`: the identity record with profile, emails and account links

pub mod user;

pub use user::{AccountLink, Email, Location, ProfileEmails, User, UserProfile, MFP_DOMAIN};
