//! # Apps Script Provider
//!
//! Collaborator for the remote manifest-generation service: a Google
//! Apps Script web app that indexes a Drive folder and republishes the
//! manifest sheet. This crate owns the trigger call and the folder-ID
//! normalization for pasted Drive links.

pub mod client;
pub mod error;
pub mod folder_id;
pub mod types;

pub use client::{AppsScriptClient, DEFAULT_TRIGGER_TIMEOUT};
pub use error::{Result, ScriptError};
pub use types::ScriptResponse;
