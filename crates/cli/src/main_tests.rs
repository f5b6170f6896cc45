// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[derive(Debug, thiserror::Error)]
#[error("docker not running")]
struct Inner;

#[derive(Debug, thiserror::Error)]
#[error("runtime error: {0}")]
struct Wrapping(#[source] Inner);

#[derive(Debug, thiserror::Error)]
#[error("start failed")]
struct Opaque(#[source] Inner);

#[test]
fn redundant_chain_is_collapsed() {
    let err = anyhow::Error::new(Wrapping(Inner));
    assert_eq!(format_error(&err), "runtime error: docker not running");
}

#[test]
fn distinct_chain_is_rendered() {
    let err = anyhow::Error::new(Opaque(Inner));
    assert_eq!(
        format_error(&err),
        "start failed\n\nCaused by:\n    0: docker not running"
    );
}

#[test]
fn global_output_flag_works_after_subcommand() {
    let cli = Cli::try_parse_from(["sim", "instances", "-o", "json"]).unwrap();
    assert_eq!(cli.output, OutputFormat::Json);
    assert!(matches!(cli.command, Some(Commands::Instances)));
}

#[test]
fn no_subcommand_parses() {
    let cli = Cli::try_parse_from(["sim"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.output, OutputFormat::Text);
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
