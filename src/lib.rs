pub mod agents;
pub mod config;
pub mod core;
pub mod edit;
pub mod export;
pub mod persist;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod suggest;
pub mod tree;

pub use crate::core::model::{PageDimension, Paragraph};
pub use session::Workbench;
pub use state::{Action, DocumentState, DocumentStore};
