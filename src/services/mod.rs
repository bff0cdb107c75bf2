pub mod bridge;
pub mod database;
pub mod drivers;

pub use bridge::SqlBridge;
