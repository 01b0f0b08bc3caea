//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod list;
mod process;
mod search;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use list::run_list;
pub use process::run_process;
pub use search::run_search;
pub use serve::{router, run_serve};
