//! Unit tests for the server test module.
