//! Extractors that pull the two billing figures out of raw payloads.
//!
//! Both extractors are heuristic and never fail: a payload they cannot read
//! is simply no match.

pub mod html;
pub mod json;
