// Estimo application layer: route table, app bootstrap and the CLI commands
// driving the stores.

pub mod app;
pub mod cli;
pub mod commands;
pub mod router;

pub use app::{App, AppError, View};
pub use router::{Page, Resolved, RouteError, Router};
