pub mod op;
pub mod permission;
pub mod session;
pub mod tool;
pub mod transcript;

pub use op::*;
pub use permission::*;
pub use session::*;
pub use tool::*;
pub use transcript::*;
