pub mod http;
pub mod inventory;
pub mod logging;
pub mod retry;
pub mod runtime;

pub use inventory::{load_inventory, InventoryRecord};
pub use logging::init_logging;
pub use runtime::{block_on, GLOBAL_RUNTIME};
