//! Data models

pub mod health;
pub mod reading;
pub mod scored;

pub use health::*;
pub use reading::*;
pub use scored::*;
