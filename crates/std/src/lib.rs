//! `core`/`alloc`/`std` re-exports behind a single `std` feature switch, so
//! downstream crates can write one set of imports regardless of target.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
pub use std::{borrow, boxed, collections, format, string, vec};

#[cfg(not(feature = "std"))]
pub use alloc::{borrow, boxed, collections, format, string, vec};

pub use core::{cell, cmp, convert, fmt, hash, iter, marker, mem, ops, option, result, slice, str};

#[cfg(feature = "print-trace")]
pub fn start_timer(label: &str) {
    println!("start: {label}");
}

#[cfg(feature = "print-trace")]
pub fn end_timer(label: &str) {
    println!("end: {label}");
}
