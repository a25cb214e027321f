//! Transport: a single non-blocking named pipe (spec.md §4.3 `Fifo`, §6).

pub mod fifo;
