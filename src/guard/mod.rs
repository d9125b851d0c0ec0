// src/guard/mod.rs
mod alerts;
mod overload;
mod sweeper;

pub use alerts::{Alert, AlertKind, AlertLog, Severity};
pub use overload::{Admission, OverloadGuard};
pub use sweeper::WindowSweeper;
