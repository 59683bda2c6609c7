mod config_gen;
mod summary;

pub use config_gen::config_generate;
pub use summary::{print_summary, render_summary};
