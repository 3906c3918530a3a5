//! Parser behaviour over the sample configuration

use polyglot_parser::polyglot::ast::{
    DirectiveNode, DirectiveNodeKind, NodeKind, ParameterValue, SyntaxTree,
};
use polyglot_parser::polyglot::parsing::{parse, PackageReference};
use polyglot_parser::polyglot::testing::{sample_configuration, samples};
use rstest::rstest;

fn parse_sample(code: &str) -> SyntaxTree {
    parse(code, None, &sample_configuration())
}

fn only_directive(tree: &SyntaxTree) -> DirectiveNode<'_> {
    let directives = tree.directive_nodes();
    assert_eq!(directives.len(), 1, "expected one directive in {tree}");
    directives[0]
}

#[rstest(
    offset,
    expected,
    case(0, Some("csharp")),
    case(4, Some("csharp")),
    case(12, Some("csharp")),
    case(20, Some("fsharp")),
    case(32, Some("fsharp")),
    case(39, Some("fsharp")),
    case(40, None)
)]
fn test_language_at_position(offset: usize, expected: Option<&str>) {
    let tree = parse_sample(samples::TWO_KERNELS);
    assert_eq!(tree.language_at_position(offset), expected);
}

#[test]
fn test_action_directive_reports_scope_kernel() {
    let tree = parse_sample("#!fsharp\nlet x = 1\n#!time\nlet y = 2");
    let time = tree.directive_nodes()[1];
    assert_eq!(time.kind(), DirectiveNodeKind::Action);
    assert_eq!(time.kernel_name(), Some("fsharp"));
    assert_eq!(time.target_kernel_name(), Some(".NET"));
    let offset = tree.text().find("#!time").unwrap() + 2;
    assert_eq!(tree.language_at_position(offset), Some("fsharp"));
}

#[test]
fn test_code_without_selector_uses_default_kernel() {
    let tree = parse_sample(samples::SINGLE_KERNEL);
    let languages = tree.language_nodes();
    assert_eq!(languages.len(), 1);
    assert_eq!(languages[0].kernel_name(), Some("csharp"));
    assert_eq!(languages[0].code(), samples::SINGLE_KERNEL);
}

#[test]
fn test_explicit_language_by_alias() {
    let tree = parse("let x = 1", Some("F#"), &sample_configuration());
    assert_eq!(tree.language_nodes()[0].kernel_name(), Some("fsharp"));
}

#[test]
fn test_selector_by_alias() {
    let tree = parse_sample("#!C#\nvar x = 1;");
    let selector = only_directive(&tree);
    assert!(selector.is_kernel_selector());
    assert_eq!(selector.target_kernel_name(), Some("csharp"));
}

#[test]
fn test_set_parameter_values() {
    let tree = parse_sample(samples::SET_VALUE);
    let set = only_directive(&tree);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    assert_eq!(
        set.parameter_values(&sample_configuration()),
        vec![
            ("--name".to_string(), ParameterValue::Literal("x".to_string())),
            ("--value".to_string(), ParameterValue::Literal("1".to_string())),
            ("--byref".to_string(), ParameterValue::Flag(false)),
        ]
    );
}

#[test]
fn test_implicit_parameter_binding() {
    let tree = parse_sample("#!set --name x 42");
    let values = only_directive(&tree).parameter_values(&sample_configuration());
    assert!(values.contains(&("--value".to_string(), ParameterValue::Literal("42".to_string()))));
}

#[test]
fn test_flag_and_alias() {
    let tree = parse_sample("#!who -v");
    let values = only_directive(&tree).parameter_values(&sample_configuration());
    assert_eq!(values, vec![("--verbose".to_string(), ParameterValue::Flag(true))]);
}

#[test]
fn test_slash_parameter_name() {
    let tree = parse_sample("#!set /name x /value 1");
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
}

#[test]
fn test_json_parameter_value() {
    let tree = parse_sample("#!set --name x --value {\"a\": [1, 2]}");
    let values = only_directive(&tree).parameter_values(&sample_configuration());
    assert_eq!(
        values[1],
        (
            "--value".to_string(),
            ParameterValue::Json(serde_json::json!({"a": [1, 2]}))
        )
    );
}

#[test]
fn test_expression_parameter_value() {
    let tree = parse_sample(samples::INPUT_EXPRESSION);
    let set = only_directive(&tree);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    let values = set.parameter_values(&sample_configuration());
    assert_eq!(
        values[1],
        (
            "--value".to_string(),
            ParameterValue::Expression {
                expression_type: "input".to_string(),
                arguments: "Enter a URL".to_string(),
            }
        )
    );
    let expression = set
        .syntax()
        .descendants()
        .into_iter()
        .find(|n| n.kind() == NodeKind::Expression)
        .unwrap();
    assert_eq!(expression.text(), "{{input:Enter a URL}}");
}

#[test]
fn test_subcommand() {
    let tree = parse_sample(samples::CONNECT_JUPYTER);
    let connect = only_directive(&tree);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    assert_eq!(connect.invoked_directive(), "#!connect jupyter");
    let json = connect.parameters_as_json(&sample_configuration());
    assert_eq!(json["kernelName"], "pythonkernel");
    assert_eq!(json["kernelSpec"], "python3");
    assert_eq!(json["bearer"], false);
}

#[test]
fn test_subcommand_parameter_values() {
    let tree = parse_sample("#!connect jupyter --kernel-name py");
    let connect = only_directive(&tree);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    assert_eq!(connect.subcommand_name(), Some("jupyter"));
    assert_eq!(
        connect.parameter_values(&sample_configuration()),
        vec![
            ("--kernel-name".to_string(), ParameterValue::Literal("py".to_string())),
            ("--bearer".to_string(), ParameterValue::Flag(false)),
        ]
    );
}

#[test]
fn test_nuget_reference_is_a_directive() {
    let tree = parse_sample(samples::PACKAGES);
    let reference = tree
        .directive_nodes()
        .into_iter()
        .find(|d| d.name() == "#r")
        .unwrap();
    assert_eq!(reference.kernel_name(), Some("fsharp"));
    assert_eq!(
        reference.package_reference(),
        Some(PackageReference::new(
            "Newtonsoft.Json",
            Some("13.0.1".to_string())
        ))
    );
}

#[test]
fn test_file_reference_is_language() {
    let tree = parse_sample("#r \"/tmp/lib.dll\"\nvar x = 1;");
    assert!(tree.directive_nodes().is_empty());
    let languages = tree.language_nodes();
    assert_eq!(languages.len(), 1);
    assert_eq!(languages[0].code(), "#r \"/tmp/lib.dll\"\nvar x = 1;");
}

#[test]
fn test_indented_directive_is_language() {
    let tree = parse_sample("var x = 1;\n  #!fsharp\n");
    assert!(tree.directive_nodes().is_empty());
}

#[test]
fn test_whitespace_only_language_node() {
    let tree = parse_sample("\n#!fsharp\nlet x = 1");
    let first = tree.language_nodes()[0];
    assert!(first.is_whitespace_only());
    assert_eq!(first.kernel_name(), Some("csharp"));
}

#[test]
fn test_find_node_inside_parameter() {
    let tree = parse_sample(samples::SET_VALUE);
    let offset = samples::SET_VALUE.find(" x").unwrap() + 1;
    let node = tree.find_node(offset).unwrap();
    assert_eq!(node.kind(), NodeKind::ParameterValue);
    assert_eq!(node.text(), "x");
    assert_eq!(
        node.parent().map(|p| p.kind()),
        Some(NodeKind::DirectiveParameter)
    );
}

#[test]
fn test_find_node_by_span() {
    let tree = parse_sample(samples::SET_VALUE);
    let node = tree.find_node_by_span(0..5).unwrap();
    assert_eq!(node.kind(), NodeKind::DirectiveName);
}

#[test]
fn test_empty_submission() {
    let tree = parse_sample("");
    assert_eq!(tree.to_string(), "");
    assert!(tree.root().child_nodes().next().is_none());
    assert_eq!(tree.language_at_position(0), None);
}
