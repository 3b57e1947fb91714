mod format;
mod path;

pub use format::{format_size, format_timestamp};
pub use path::{guess_mime, normalize_path, relative_path_string};
