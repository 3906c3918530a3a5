use polyglot_config::{load_defaults, ConfigurationError, Loader};
use polyglot_parser::polyglot::testing::{sample_configuration, samples};
use polyglot_parser::polyglot::{parse, DirectiveConfigError};
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn user_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn defaults_match_the_shared_sample_registry() {
    let loaded = load_defaults()
        .expect("defaults to deserialize")
        .directive_configuration()
        .expect("defaults to validate");
    let sample = sample_configuration();

    assert_eq!(loaded.root(), sample.root());
    assert_eq!(loaded.kernels(), sample.kernels());
    assert_eq!(loaded.default_kernel_name(), sample.default_kernel_name());
}

#[rstest]
#[case(samples::SINGLE_KERNEL)]
#[case(samples::TWO_KERNELS)]
#[case(samples::PACKAGES)]
#[case(samples::CONNECT_JUPYTER)]
#[case(samples::UNKNOWN_DIRECTIVE)]
fn defaults_parse_like_the_sample_registry(#[case] code: &str) {
    let loaded = Loader::new().load().expect("defaults to load");
    let sample = sample_configuration();

    let from_defaults = parse(code, None, &loaded);
    let from_sample = parse(code, None, &sample);

    assert_eq!(from_defaults.diagnostics(), from_sample.diagnostics());
}

#[test]
fn user_file_overrides_defaults() {
    let file = user_file("default_kernel = \"fsharp\"\nexpression_types = [\"secret\"]\n");

    let configuration = Loader::new()
        .with_file(file.path())
        .load()
        .expect("layered config to load");

    assert_eq!(configuration.default_kernel_name(), "fsharp");
    assert!(configuration.is_expression_type("secret"));
    assert!(configuration.is_expression_type("input"));
    assert_eq!(configuration.kernels().len(), 4);
}

#[test]
fn missing_required_file_is_a_load_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = Loader::new()
        .with_file(dir.path().join("absent.toml"))
        .load()
        .unwrap_err();

    assert!(matches!(error, ConfigurationError::Load(_)));
}

#[test]
fn missing_optional_file_is_ignored() {
    let dir = tempfile::tempdir().expect("temp dir");
    let configuration = Loader::new()
        .with_optional_file(dir.path().join("absent.toml"))
        .load()
        .expect("defaults to load");

    assert_eq!(configuration.default_kernel_name(), "csharp");
}

#[test]
fn invalid_directive_name_is_rejected_at_load() {
    let file = user_file("[root]\nname = \".NET\"\n\n[[root.directives]]\nname = \"time\"\n");

    let error = Loader::new().with_file(file.path()).load().unwrap_err();

    match error {
        ConfigurationError::Registry(DirectiveConfigError::InvalidDirectiveName { name }) => {
            assert_eq!(name, "time")
        }
        other => panic!("expected an invalid directive name, got {other:?}"),
    }
}
