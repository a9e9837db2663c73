pub mod chemical;
pub mod parser;
pub mod physiology;
pub mod store;
pub mod units;
pub use chemical::*;
pub use physiology::*;
pub use store::*;
pub use units::*;
