pub mod context;
pub mod prompt;
pub mod session;

pub use context::{ContextCarrier, FOLLOW_UP_INDICATORS};
pub use session::{AnalystSession, AnalystSessionBuilder};
