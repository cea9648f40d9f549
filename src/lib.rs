//! paranews - content API for the Paralympic committee website
//!
//! Manages tags, categories, news classifications and news articles, plus the
//! images attached to them.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
