//! Error module root.
//!
//! Fault response: CRITICAL → ERROR, LIMITING → derate, WARNING → report.

pub mod propagation;
