pub mod loaders;
pub mod page_profile;

pub use loaders::{load_page_profile, load_prompts_file, parse_prompts};
pub use page_profile::{PageProfile, Timing};
