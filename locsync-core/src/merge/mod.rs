pub mod field;
pub mod patches;
pub mod secrets;
pub mod tags;

pub use field::{ensure_html_fragment, merge_html, set_action_html, set_html_field, Position};
pub use patches::{apply_action_overrides, apply_manual_description_patches, apply_manual_entry_patches};
pub use secrets::{dedupe_secret_content, preserve_secret_sections_from_source};
pub use tags::merge_foundry_tags;
