pub mod connection;
pub mod headless;
pub mod link;

pub use connection::{connect_to_browser, find_target_page};
pub use headless::launch_headless_browser;
pub use link::ChromiumLink;
