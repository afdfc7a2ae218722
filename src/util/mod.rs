//! Utility functions for common operations.
//!
//! - **URL validation**: scheme allow-list for URLs handed to the system browser
//!
//! # Examples
//!
//! ```
//! use chatdeck::util::validate_url_for_open;
//!
//! let url = validate_url_for_open("https://rocket.chat").unwrap();
//! assert_eq!(url.scheme(), "https");
//! ```

mod url_validator;

pub use url_validator::{validate_url_for_open, UrlValidationError};
