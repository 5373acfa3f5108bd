pub mod app;
pub mod append;
pub mod check;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod logs;
pub mod output;
pub mod roles;
pub mod runtime;
pub mod values;
pub mod verify;

pub use app::run;
pub use context::CliContext;
pub use env::CliArgs;
pub use output::OutputFormat;
