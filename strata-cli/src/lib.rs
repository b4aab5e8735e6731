//! Strata CLI - Command-line interface for the Strata migration generator.
//!
//! This crate provides the `strata` tool for declaring schemas, generating
//! migrations from them, and applying those migrations to PostgreSQL.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
