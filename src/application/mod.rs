//! Application services (use cases).
//!
//! These services coordinate the outbound ports on behalf of callers.

pub mod storage;
