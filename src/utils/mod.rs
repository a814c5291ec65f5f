//! Shared utility functions.

pub mod html;
