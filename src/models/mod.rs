//! Domain model module declarations.

pub mod delivery;
pub mod reminder;
pub mod report;
pub mod task;
