pub mod handlers;
pub mod service;
pub mod trend;

pub use handlers::*;
pub use service::*;
pub use trend::*;
