mod classify;
mod config_gen;
mod detect;
mod resolve;

pub use classify::classify;
pub use config_gen::{check_config, config_generate};
pub use detect::detect;
pub use resolve::resolve;
