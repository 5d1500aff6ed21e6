//! Infrastructure layer - backend implementations

pub mod storage;
