//! Integration test suite for flavdecay.
//!
//! The tests drive the relinker end to end, against scripted engines and
//! stacks that record every collaborator call, and against the
//! table-driven engine with the embedded decay table.

pub mod helpers;
