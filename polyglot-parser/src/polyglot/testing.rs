//! Testing utilities
//!
//!     Tests across the workspace share one directive configuration and one set of sample
//!     submissions, so a change to how a directive is declared is made in a single place.
//!
//!         - [sample_configuration] declares a `.NET` composite root with `csharp` (default),
//!           `fsharp`, `pwsh` and `javascript` sub-kernels and the usual magic commands.
//!         - [samples] holds named submissions used by unit, integration and CLI tests.
//!         - [mk_token] builds tokens for lexer and tree tests.

use crate::polyglot::directives::{
    DirectiveConfiguration, DirectiveDefinition, DirectiveParameter, KernelInfo,
};
use crate::polyglot::token::{Token, TokenKind};
use std::ops::Range;

pub fn mk_token(kind: TokenKind, span: Range<usize>, text: &str) -> Token {
    Token::new(kind, span, text)
}

fn reference_directives(kernel: KernelInfo) -> KernelInfo {
    let kernel = kernel
        .with_directive(
            DirectiveDefinition::action("#r")
                .parameter(DirectiveParameter::new("--package").required().implicit())
                .describe("Reference a NuGet package"),
        )
        .and_then(|k| {
            k.with_directive(
                DirectiveDefinition::action("#i")
                    .parameter(DirectiveParameter::new("--source").required().implicit())
                    .describe("Add a NuGet package source"),
            )
        });
    match kernel {
        Ok(kernel) => kernel,
        Err(error) => panic!("invalid sample reference directives: {error}"),
    }
}

fn root_kernel() -> Result<KernelInfo, crate::polyglot::directives::DirectiveConfigError> {
    KernelInfo::composite(".NET")
        .with_directive(DirectiveDefinition::action("#!time").describe("Time the execution"))?
        .with_directive(DirectiveDefinition::action("#!lsmagic"))?
        .with_directive(DirectiveDefinition::action("#!nuget-restore"))?
        .with_directive(
            DirectiveDefinition::action("#!set")
                .parameter(DirectiveParameter::new("--name").required())
                .parameter(DirectiveParameter::new("--value").implicit())
                .parameter(DirectiveParameter::new("--mime-type"))
                .parameter(DirectiveParameter::new("--byref").flag()),
        )?
        .with_directive(
            DirectiveDefinition::action("#!share")
                .parameter(DirectiveParameter::new("--from").required())
                .parameter(DirectiveParameter::new("--as"))
                .parameter(DirectiveParameter::new("--name").implicit().required()),
        )?
        .with_directive(
            DirectiveDefinition::action("#!value")
                .parameter(DirectiveParameter::new("--name").required())
                .parameter(DirectiveParameter::new("--from-file"))
                .parameter(DirectiveParameter::new("--from-url"))
                .parameter(DirectiveParameter::new("--from-value").implicit())
                .parameter(DirectiveParameter::new("--mime-type")),
        )?
        .with_directive(
            DirectiveDefinition::action("#!connect")
                .subcommand(
                    DirectiveDefinition::subcommand_named("jupyter")
                        .parameter(DirectiveParameter::new("--kernel-name").required())
                        .parameter(DirectiveParameter::new("--kernel-spec"))
                        .parameter(DirectiveParameter::new("--url"))
                        .parameter(DirectiveParameter::new("--bearer").flag()),
                )
                .subcommand(
                    DirectiveDefinition::subcommand_named("signalr")
                        .parameter(DirectiveParameter::new("--kernel-name").required())
                        .parameter(DirectiveParameter::new("--hub-url").required()),
                ),
        )
}

fn sample_kernels() -> Result<Vec<KernelInfo>, crate::polyglot::directives::DirectiveConfigError> {
    let csharp = reference_directives(KernelInfo::new("csharp").alias("C#").alias("c#"))
        .language("C#")
        .with_directive(
            DirectiveDefinition::action("#!who")
                .alias("#!whos")
                .parameter(DirectiveParameter::new("--verbose").alias("-v").flag()),
        )?;
    let fsharp = reference_directives(KernelInfo::new("fsharp").alias("F#").alias("f#"))
        .language("F#");
    let pwsh = KernelInfo::new("pwsh").alias("powershell").language("PowerShell");
    let javascript = KernelInfo::new("javascript").alias("js").language("JavaScript");
    Ok(vec![csharp, fsharp, pwsh, javascript])
}

/// The configuration most tests parse against.
pub fn sample_configuration() -> DirectiveConfiguration {
    let built = root_kernel().and_then(|root| {
        sample_kernels()?
            .into_iter()
            .fold(DirectiveConfiguration::builder(root), |builder, kernel| {
                builder.kernel(kernel)
            })
            .default_kernel("csharp")
            .build()
    });
    match built {
        Ok(configuration) => configuration,
        Err(error) => panic!("invalid sample configuration: {error}"),
    }
}

/// Named sample submissions.
pub mod samples {
    pub const SINGLE_KERNEL: &str = "var x = 1;\nConsole.WriteLine(x);\n";

    pub const TWO_KERNELS: &str = "#!csharp\nvar x = 1;\n#!fsharp\nlet y = 2\n";

    pub const SET_VALUE: &str = "#!set --name x --value 1\n";

    pub const PACKAGES: &str =
        "#!fsharp\nlet a = 1\n#r \"nuget:Newtonsoft.Json, 13.0.1\"\n#i \"nuget:https://feed/index.json\"\nlet b = 2\n";

    pub const CONNECT_JUPYTER: &str =
        "#!connect jupyter --kernel-name pythonkernel --kernel-spec python3\n";

    pub const UNKNOWN_DIRECTIVE: &str = "#!csharp\nvar x = 1;\n#!oops\n";

    pub const INPUT_EXPRESSION: &str = "#!set --name url --value {{input:Enter a URL}}\n";
}
