//! Client-side view state: persisted stores, URL-driven filters, and the
//! load state of the list and detail views.

pub mod favorites;
pub mod load;
pub mod notes;
pub mod optimistic;
pub mod pagination;
pub mod search;
pub mod theme;
pub mod url;
