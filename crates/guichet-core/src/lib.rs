//! Shared wire types for Guichet public displays.
//!
//! Everything in here mirrors the JSON bodies the backend serves; the
//! display client never mutates these except for the optimistic ticket
//! merge on [`entities::snapshot::DisplaySnapshot`].

pub mod entities;
