//! Pomelo Backend - Store backend library.
//!
//! The two load-bearing pieces are the cache-aside layer ([`cache`]) sitting
//! in front of read-heavy entities and the transactional checkout workflow
//! ([`services::checkout`]) that converts a cart into an order while
//! decrementing finite inventory. Everything else (repositories, notification
//! queue, access predicate) exists in service of those two.
//!
//! HTTP routing, authentication middleware, payments, and email transport are
//! external collaborators: this crate is a library consumed by a thin web
//! layer.
//!
//! # Modules
//!
//! - [`cache`] - Cache store, key namespaces, and the cache-aside coordinator
//! - [`db`] - Connection pool, migrations, and Postgres repositories
//! - [`services`] - Inventory ledger, checkout orchestrator, order state
//!   machine, cart and product services
//! - [`notify`] - Typed notification events, queue, and consumer
//! - [`access`] - Explicit role/operation predicate for protected operations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;

pub use error::{AppError, Result};
