pub mod change;
pub mod product;
pub mod snapshot;
pub mod webhook;

pub use change::*;
pub use product::*;
pub use snapshot::*;
pub use webhook::*;
