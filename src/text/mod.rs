//! Document text handling: fragmenting and language detection.

pub mod fragmenter;
pub mod language;

pub use fragmenter::{Document, Fragment, Fragments, split_fragments};
pub use language::{Language, detect_language};
