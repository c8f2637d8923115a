// ==============================================================================
// lib.rs - Glade Library
// ==============================================================================
// Description: Library interface for the annotation database manager
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================

pub mod checksum;
pub mod config;
pub mod database;
pub mod downloader;
pub mod error;
pub mod ffi;
pub mod store;
pub mod validator;

pub use config::{DatabaseCatalog, DatabaseFiles, Settings};
pub use database::{DatabaseManager, DatabaseStatus, DownloadReport, FileOutcome, VerifyReport};
pub use error::{GladeError, Result};
