pub mod check;
pub mod decisions;
pub mod serve;
