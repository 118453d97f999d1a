//! CLI domain: parse, route, and presentation.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_diff_line, format_file_list, format_value};
pub use route::RunContext;
