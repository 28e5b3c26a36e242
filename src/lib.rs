//! Querybot: plain-English questions over the Chinook music store database.
//!
//! Each question is turned into SQL by Gemini, run against the database, shown
//! as a table or exported as a spreadsheet, and explained in a short summary.

pub mod agent;
pub mod channels;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod llm;
pub mod present;
pub mod query;
pub mod testing;

pub use config::Config;
pub use error::{Error, Result};
