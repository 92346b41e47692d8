mod callbacks;
mod completion;
mod dispatcher;
mod notifications;
mod state;

pub(crate) use callbacks::*;
pub use completion::*;
pub use dispatcher::*;
pub use notifications::*;
pub use state::*;
