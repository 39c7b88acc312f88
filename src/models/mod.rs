//! Data models for the site config backend.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod history;
mod image;
mod site_config;

pub use history::*;
pub use image::*;
pub use site_config::*;

#[cfg(test)]
pub(crate) use site_config::fixtures;
