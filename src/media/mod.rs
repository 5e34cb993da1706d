//! Media types and `Accept` headers.
//!
//! Both are parsed leniently where HTTP allows it: names are
//! case-insensitive, whitespace around separators is ignored and trailing
//! parameters (`charset`, `boundary`) never change which handler a media
//! type resolves to.

mod accept;
mod media_type;

pub use accept::{AcceptEntry, AcceptHeader};
pub use media_type::MediaType;
