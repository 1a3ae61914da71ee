#![warn(missing_docs, missing_debug_implementations)]

//! Check whether a username is available across platforms, as you type.
//!
//! A [`SearchController`](controller::SearchController) turns keystrokes into
//! debounced lookups against an availability backend, keeps the page URL
//! fragment in sync with the current query, and makes sure only the answer
//! to the most recently launched query is ever displayed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use handle_avail::check::Client;
//! use handle_avail::config::{Config, Overrides};
//! use handle_avail::controller::SearchController;
//! use handle_avail::fragment::PageLocation;
//!
//! let page: PageLocation = "http://localhost/?port=8080#bob".parse().unwrap();
//! let config = Config::from_page(&page, &Overrides::default()).unwrap();
//! let client = Client::new(&config);
//!
//! let mut controller = SearchController::new(Arc::new(client), page, &config);
//! controller.on_load();
//! controller.run_until_idle();
//! print!("{}", controller.display());
//! ```

pub mod check;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod fragment;
pub mod render;
pub mod terminal;
