//! Types shared between the drive engine, its HTTP transport and front ends.

pub mod domain;
pub mod error;
pub mod protocol;
