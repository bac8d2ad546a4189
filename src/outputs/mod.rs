//! Output generation for the announcement feed.
//!
//! # Submodules
//!
//! - [`json`]: Writes the `RunPayload` as a JSON document and as a browser
//!   script assigning the same document to a global variable
//!
//! Downstream publishers only ever read these files.

pub mod json;
