//! Multi-server chat desktop shell.
//!
//! Keeps a persistent list of chat servers, one browsing context per server,
//! a sidebar with unread badges, certificate trust decisions and the
//! surrounding chrome (tray, dock, menu). The `console` module is a
//! line-oriented front end driving all of it.

pub mod app;
pub mod config;
pub mod console;
pub mod events;
pub mod instance;
pub mod preferences;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod shell;
pub mod sidebar;
pub mod storage;
pub mod trust;
pub mod util;
