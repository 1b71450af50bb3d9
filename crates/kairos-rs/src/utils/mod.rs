//! Small helper utilities used by the dispatch fabric.

pub mod path;
