//! CSV codec for Roll.
//!
//! Converts between CSV tables and [`roll_core`] domain types. Pure
//! synchronous; no HTTP or database dependencies. Readers tolerate the
//! column names of older spreadsheet exports; writers always emit the
//! current snake_case layout.
//!
//! # Quick start
//!
//! ```no_run
//! use roll_csv::read_children;
//!
//! let table = "Full Name,Grade\nAmani Wanjiru,Grade 3\n";
//! for row in read_children(table.as_bytes()).unwrap() {
//!   println!("{:?}", row.map(|c| c.class_group));
//! }
//! ```

pub mod error;
mod read;
mod write;

pub use error::{Error, Result};
pub use read::{AttendanceRow, ChildRef, read_attendance, read_children};
pub use write::{write_attendance, write_children};
