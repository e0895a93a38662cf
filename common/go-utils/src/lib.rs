//! Version matching and the dependency catalog shared by the Go vendor
//! buildpack and its tooling.

pub mod manifest;
pub mod vrs;
