//! Treeviz formatter for syntax trees
//!
//! One line per node, nesting shown with box-drawing connectors:
//!
//!     <prefix><connector> <icon> <NodeType>(<kernel>) <text, truncated to 30 characters>
//!
//! The kernel shown is the node's target kernel when it has one (the kernel a selector switches
//! to, or the kernel declaring an action), otherwise the kernel it belongs to. Line breaks in
//! the text are drawn as `↵`.
//!
//! Icons
//!     Submission: ⧉
//!     Language: ¶
//!     KernelSelector: ⇄
//!     Action: ⚙
//!     DirectiveName: #
//!     DirectiveSubcommand: ›
//!     DirectiveParameter: ≔
//!     ParameterName: ◦
//!     ParameterValue: =
//!     Expression: ƒ
//!     ExpressionType: τ
//!     ExpressionArguments: …

use crate::polyglot::ast::{snapshot_from_tree, SyntaxTree, TreeSnapshot};

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let mut truncated = s.chars().take(max_chars).collect::<String>();
        truncated.push_str("...");
        truncated
    } else {
        s.to_string()
    }
}

fn get_icon(node_type: &str) -> &'static str {
    match node_type {
        "Submission" => "⧉",
        "Language" => "¶",
        "KernelSelector" => "⇄",
        "Action" => "⚙",
        "DirectiveName" => "#",
        "DirectiveSubcommand" => "›",
        "DirectiveParameter" => "≔",
        "ParameterName" => "◦",
        "ParameterValue" => "=",
        "Expression" => "ƒ",
        "ExpressionType" => "τ",
        "ExpressionArguments" => "…",
        _ => "○",
    }
}

fn describe(snapshot: &TreeSnapshot) -> String {
    let mut line = format!("{} {}", get_icon(&snapshot.node_type), snapshot.node_type);
    let kernel = snapshot
        .attributes
        .get("target")
        .or_else(|| snapshot.attributes.get("kernel"));
    if let Some(kernel) = kernel {
        line.push_str(&format!("({kernel})"));
    }
    if !snapshot.label.is_empty() {
        let label = snapshot.label.replace("\r\n", "↵").replace(['\n', '\r'], "↵");
        line.push(' ');
        line.push_str(&truncate(&label, 30));
    }
    line
}

fn format_snapshot(
    snapshot: &TreeSnapshot,
    prefix: &str,
    child_index: usize,
    child_count: usize,
) -> String {
    let is_last = child_index == child_count - 1;
    let connector = if is_last { "└─" } else { "├─" };
    let mut output = format!("{}{} {}\n", prefix, connector, describe(snapshot));

    let child_prefix = format!("{}{}", prefix, if is_last { "  " } else { "│ " });
    let child_count = snapshot.children.len();
    for (i, child) in snapshot.children.iter().enumerate() {
        output.push_str(&format_snapshot(child, &child_prefix, i, child_count));
    }

    output
}

pub fn to_treeviz_str(tree: &SyntaxTree) -> String {
    let snapshot = snapshot_from_tree(tree);
    let mut output = format!("{}\n", describe(&snapshot));
    let child_count = snapshot.children.len();
    for (i, child) in snapshot.children.iter().enumerate() {
        output.push_str(&format_snapshot(child, "", i, child_count));
    }
    output
}
