pub mod chromium;
pub mod driver;
pub mod scripts;

pub use chromium::ChromiumLauncher;
pub use driver::{
    BrowserLauncher, BrowserSession, ElementHandle, LaunchOptions, LaunchedBrowser, PageDriver,
};
