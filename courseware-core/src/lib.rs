//! Courseware core library: domain types, course store, settings, errors.
//!
//! - [`types`]: newtypes and domain structs
//! - [`error`]: [`StoreError`]
//! - [`store`]: locked, transactional course records
//! - [`config`]: [`Settings`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::Settings;
pub use error::StoreError;
pub use store::{CourseStore, CourseTransaction};
pub use types::{
    AvailablePoint, Course, CourseName, Exercise, ExerciseName, Options, SourceBackend,
    SourceLocation,
};
