//! Posting Service - purchase-invoice posting engine.

pub mod config;
pub mod handlers;
pub mod models;
pub mod posting;
pub mod services;
pub mod startup;
