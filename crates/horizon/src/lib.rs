pub mod client;
pub mod resources;

pub use client::{HorizonClient, HorizonError};
pub use resources::{
    AccountRecord, BalanceLine, LedgerRecord, Problem, ProblemExtras, ResultCodes, SubmitResponse,
};
