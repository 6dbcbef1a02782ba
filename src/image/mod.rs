pub mod loader;
pub mod preprocessing;

pub use loader::{ImageLoader, ImageSource};
pub use preprocessing::ImagePreprocessor;
