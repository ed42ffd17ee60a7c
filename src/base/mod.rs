//! Core components, types, and utilities for the bot-launcher.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Error formatting for logs.
//! - Process-wide failure surfaces.
//! - Common types and result handling.

pub mod config;
pub mod error_detail;
pub mod supervise;
pub mod types;
