//! GetLoanOffer lead-capture service library.
//!
//! Serves the marketing pages, accepts loan applications from the HTML form
//! and the JSON API, stores them through a [`storage::LeadStore`], and
//! exposes the EMI calculator.
//!
//! # Modules
//!
//! - `config`: Configuration from environment variables.
//! - `emi`: EMI calculation.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Lead and wire types.
//! - `routes`: Router assembly.
//! - `storage`: Lead persistence (JSON + CSV files, or in memory).

pub mod config;
pub mod emi;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod storage;
