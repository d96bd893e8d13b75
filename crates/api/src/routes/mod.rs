//! Route handlers

pub mod lotto;
pub mod records;
