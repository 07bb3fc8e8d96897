pub mod error;
pub mod fingerprint;
pub mod intern;
pub mod key;
pub mod node;
pub mod source;

// Re-export commonly used types
pub use error::CoreError;
pub use fingerprint::Fingerprint;
pub use intern::{Symbol, SymbolTable};
pub use key::{Aspect, DepKey, Designator};
pub use node::DepNode;
pub use source::DepSource;
