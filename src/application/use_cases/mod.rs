/// Use cases module containing application orchestration
mod run_harness;

pub use run_harness::{HarnessState, RunHarnessUseCase};
