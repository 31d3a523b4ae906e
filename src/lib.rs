//! Client-state core for a character browser.
//!
//! Persisted favorites, per-character notes and theme preference sit on a
//! small key-value adapter ([`storage`]); list filters, sorting and
//! pagination live in the URL ([`state::url`]); remote data comes from a
//! cancellable fetcher ([`api`]) whose results feed per-view load state
//! ([`state::load`]).

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
