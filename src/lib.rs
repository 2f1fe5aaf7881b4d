//! activitydesk - temporal activity extraction and lookup for post feeds.
//!
//! Scraped social-media posts are normalised into dated activities: the
//! event date is recovered from free text, each post gets a stable identity
//! for deduplication, and activities are classified relative to "today" in a
//! fixed timezone. The query engine and the tool layer answer "what happened
//! recently" and "what is coming up" for a function-calling assistant.

pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod services;
pub mod tools;
