mod error;
mod layout;

pub use error::StorageError;
pub use layout::SourceLayout;
