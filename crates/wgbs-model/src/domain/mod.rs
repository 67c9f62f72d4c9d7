mod kv;
pub use kv::KeyValue;

mod command_env;
pub use command_env::CommandEnv;

mod command;
pub use command::{CommandSpec, shell_quote};

mod constants;
pub use constants::*;

mod exec_mode;
pub use exec_mode::ExecMode;

mod run_context;
pub use run_context::RunContext;

mod job_state;
pub use job_state::{JobOutcome, JobState, StateError};
