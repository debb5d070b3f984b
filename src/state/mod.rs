//! Local persistence for revalidation
//!
//! Two stores back the conditional-fetch cycle: the conditional-state file
//! (which validators we hold per URL) and the byte/HTML cache (what body
//! those validators refer to).

mod conditional;
mod html_cache;

pub use conditional::{ConditionalRecord, ConditionalStore};
pub use html_cache::HtmlCache;
