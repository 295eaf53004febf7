//! Portfolio - REST backend for a personal portfolio site
//!
//! Serves projects, blog posts, motivations, build-in-public logs and
//! personal tasks over a JSON API with cookie or bearer-token auth.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
