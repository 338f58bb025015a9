pub mod markdown;
pub mod normalize;
pub mod sanitize;

pub use markdown::markdown_to_html;
pub use normalize::{normalize_key, resolve_alias};
pub use sanitize::{sanitize_html, sanitize_name, strip_links};
