//! External paper sources.

pub mod arxiv;
