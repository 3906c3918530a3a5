//! JSON output of tree snapshots

use crate::polyglot::ast::{snapshot_from_tree, SyntaxTree};

pub fn to_json_string(tree: &SyntaxTree) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&snapshot_from_tree(tree))
}
