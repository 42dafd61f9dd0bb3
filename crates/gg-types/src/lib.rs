pub mod alerts;
pub mod errors;
pub mod position;
pub mod quotes;
pub mod risk_level;

pub use alerts::*;
pub use errors::*;
pub use position::*;
pub use quotes::*;
pub use risk_level::*;
