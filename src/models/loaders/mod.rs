pub mod profile_loader;
pub mod prompt_loader;

pub use profile_loader::load_page_profile;
pub use prompt_loader::{load_prompts_file, parse_prompts};
