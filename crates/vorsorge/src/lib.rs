//! `vorsorge` - Family record keeping for pediatric checkups
//!
//! Parents register, add their children, and track the ten standard
//! U-checkups (U1 to U9, including U7a). The checkup dates are computed from
//! each child's birth date and stored alongside the child.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod model;
pub mod schedule;
pub mod storage;
pub mod web;

pub use auth::{Argon2Hasher, PasswordHasher};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{Appointment, AppointmentStatus, Child, ExamType, Parent, User};
pub use storage::{Storage, StorageStats};
pub use web::AppState;
