pub mod app;
pub mod classify;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod output;
pub mod runtime;
pub mod signatures;
pub mod simulate;

pub use app::run;
pub use classify::{cmd_classify, ClassifyArgs};
pub use info::cmd_info;
pub use signatures::cmd_signatures;
pub use simulate::{cmd_simulate, SimulateArgs};
