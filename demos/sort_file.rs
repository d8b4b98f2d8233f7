//! Sorts an XML file and prints the result.
//!
//! ```text
//! cargo run --example sort_file -- data.xml ./@id ./name
//! ```
//!
//! Every argument after the file name is a sort key.

use std::env;
use std::process::ExitCode;

use xmlsort::parser::{parse_file, ParseOptions};
use xmlsort::serial::{serialize_with_options, SerializeOptions};
use xmlsort::sort;

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: sort_file <FILE> [XPATH...]");
        return ExitCode::from(2);
    };
    let keys: Vec<String> = args.collect();

    let result = parse_file(&path, &ParseOptions::default().no_blanks(true)).and_then(|mut doc| {
        sort::sort_document_by_paths(&mut doc, &keys, None)?;
        Ok(doc)
    });

    match result {
        Ok(doc) => {
            let options = SerializeOptions::default().indent(true);
            print!("{}", serialize_with_options(&doc, &options));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{path}: {e}");
            ExitCode::FAILURE
        }
    }
}
