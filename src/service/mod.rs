//! # Service Layer
//!
//! Client-side entry point for calling remote methods.

pub mod client;

pub use client::{Client, Transport};
