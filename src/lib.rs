//! Lead Relay Library
//!
//! Receives lead submissions over HTTP, validates them, and fans each one
//! out to Notion, Google Sheets and an optional generic webhook, reporting
//! per-destination success.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Validation, dispatch and shared models/errors.
//! - `integrations`: Delivery destinations.
//! - `app`: Router assembly and middleware stack.
//! - `auth`: Shared-secret API key middleware.
//! - `config`: Configuration management.
//! - `delivery`: Destination trait and shared HTTP helpers.
//! - `dispatcher`: Concurrent fan-out to all destinations.
//! - `errors`: Error handling types.
//! - `google_auth`: Google service-account token exchange.
//! - `handlers`: HTTP request handlers.
//! - `models`: Lead and delivery result models.
//! - `notion_client`: Notion destination.
//! - `sheets_client`: Google Sheets destination.
//! - `validation`: Lead payload validation.
//! - `webhook_client`: Generic webhook destination.

pub mod api;
pub mod core;
pub mod integrations;

pub mod app;
pub mod auth;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod errors;
pub mod google_auth;
pub mod handlers;
pub mod models;
pub mod notion_client;
pub mod sheets_client;
pub mod validation;
pub mod webhook_client;
