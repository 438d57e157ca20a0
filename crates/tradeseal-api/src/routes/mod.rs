//! Route modules. Each exposes a `router()` merged by [`crate::app`].

pub mod binding;
pub mod zkp;
