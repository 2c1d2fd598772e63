//! Rendering the fetched sections into a document and delivering it.
//!
//! # Submodules
//!
//! - [`html`]: Wraps the sections, in edition order, in an HTML page
//! - [`file`]: Writes the page to a local file (the preview)
//! - [`email`]: Sends the page as an HTML email over SMTP
//!
//! Delivery failures are returned to `main`; nothing here is retried.

pub mod email;
pub mod file;
pub mod html;
