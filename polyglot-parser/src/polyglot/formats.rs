//! Output formats for syntax trees
//!
//!     - [treeviz]: one line per node with connectors and icons, for people
//!     - [json]: the serde snapshot of the tree, for tools

pub mod json;
pub mod treeviz;

pub use json::to_json_string;
pub use treeviz::to_treeviz_str;
