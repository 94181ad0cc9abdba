pub mod keyword;
pub mod catalog;
pub mod config;
pub mod settings;

pub use keyword::*;
pub use catalog::*;
pub use config::*;
pub use settings::*;
