//! Foundation types shared by every subsystem

pub mod math;
