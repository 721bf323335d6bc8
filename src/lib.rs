//! Marketwire - storefront and newsroom backend
//!
//! This library provides the catalogue, cart, wishlist, review, taxonomy,
//! banner and news functionality behind the Marketwire REST API.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
