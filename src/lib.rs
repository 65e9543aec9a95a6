//! Project explorer for a remote editor Core.
//!
//! [`client`] talks to the Core over JSON-RPC and a push socket (or through an
//! embedding host's bridge); [`explorer`] keeps the lazily loaded directory
//! tree. The remaining modules make up the terminal front end.

pub mod app;
pub mod client;
pub mod components;
pub mod config;
pub mod error;
pub mod event;
pub mod explorer;
pub mod handler;
pub mod theme;
pub mod tui;
pub mod ui;
