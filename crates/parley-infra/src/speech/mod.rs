//! Speech synthesis back-ends.

pub mod http;
