//! Domain-state engine for the Daybook chat and productivity client.
//!
//! Five independent managers live here: [`session::SessionStore`],
//! [`timeline::MessageTimeline`], [`habit::HabitTracker`],
//! [`note::NoteStore`] and [`plan::WeeklyPlanner`]. None of them calls
//! another; a presentation layer composes their views at render time.
//!
//! This crate is free of HTTP and database dependencies. Storage backends and
//! the remote auth client plug in through [`storage::KeyValueStore`] and
//! [`auth::AuthBackend`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod error;
pub mod fixtures;
pub mod habit;
pub mod note;
pub mod plan;
pub mod session;
pub mod storage;
pub mod timeline;

pub use error::{Error, Result};
