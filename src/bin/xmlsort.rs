//! xmlsort -- reorder the child nodes of an XML document.
//!
//! Loads `INPUT` with blank text nodes dropped, optionally deletes the nodes
//! an exclusion expression selects, sorts every element's children by tag
//! name (or by the given `XPath` sort keys) and writes the indented result
//! to `OUTPUT` as UTF-8.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use xmlsort::parser::{self, ParseOptions};
use xmlsort::serial::{serialize_with_options, SerializeOptions};
use xmlsort::sort;

/// Sort the child nodes of an XML document.
///
/// Without sort keys, siblings are ordered by tag name. Each `XPath` sort
/// key is evaluated relative to a sibling; its first result gives the key
/// (an element's name, any other node's value). Later keys break ties.
#[derive(Parser, Debug)]
#[command(name = "xmlsort", version, about, disable_version_flag = true)]
struct Cli {
    /// Input XML file.
    input: PathBuf,

    /// File to write the sorted document to.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Sort keys, highest priority first. Comma-separated; may be repeated.
    #[arg(
        short = 'V',
        long = "useValues",
        visible_alias = "useValue",
        value_name = "XPATH",
        value_delimiter = ','
    )]
    use_values: Vec<String>,

    /// Delete the nodes this expression selects before sorting.
    #[arg(long = "excludeXPath", value_name = "XPATH")]
    exclude_xpath: Option<String>,

    /// Spaces per nesting level in the output.
    #[arg(long, value_name = "N", default_value_t = 4)]
    indent: usize,

    /// Log what is being done to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Print version.
    #[arg(long, action = ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut doc = parser::parse_file(&cli.input, &ParseOptions::default().no_blanks(true))
        .with_context(|| format!("failed to load {}", cli.input.display()))?;

    sort::sort_document_by_paths(&mut doc, &cli.use_values, cli.exclude_xpath.as_deref())
        .context("failed to sort document")?;

    let options = SerializeOptions::default()
        .indent(true)
        .indent_str(&" ".repeat(cli.indent));
    let xml = serialize_with_options(&doc, &options);

    fs::write(&cli.output, &xml)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    debug!(
        output = %cli.output.display(),
        bytes = xml.len(),
        "wrote sorted document"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_use_values_split_and_concatenate() {
        let cli = Cli::try_parse_from([
            "xmlsort", "-V", ".,@id", "--useValue", "./text()", "-o", "out.xml", "in.xml",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cli.use_values, [".", "@id", "./text()"]);
        assert_eq!(cli.indent, 4);
        assert_eq!(cli.exclude_xpath, None);
    }

    #[test]
    fn test_output_is_required() {
        let err = Cli::try_parse_from(["xmlsort", "in.xml"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
