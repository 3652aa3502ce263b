//! Test-only crate: end-to-end lifecycle tests live in `tests/`.
