//! capfetch - fetch online videos with their captions, clean the captions and
//! translate them in batches through a hosted language model.
//!
//! The caption pipeline (parse, clean, translate, write) lives in `caption` and
//! `translate`; `fetch` drives the external download program and `workflow`
//! ties both together.

pub mod caption;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod progress;
pub mod session;
pub mod translate;
pub mod validation;
pub mod workflow;
