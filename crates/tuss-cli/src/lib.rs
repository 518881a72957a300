#![deny(unsafe_code)]

//! Library side of the `tuss` binary: logging setup and batch file I/O.

pub mod batch;
pub mod logging;
