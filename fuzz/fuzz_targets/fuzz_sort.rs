#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlsort::parser::{parse_str_with_options, ParseOptions};
use xmlsort::serial::{serialize_with_options, SerializeOptions};
use xmlsort::sort;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let opts = ParseOptions::default().no_blanks(true);
        // Load -> sort -> serialize -> reload should never panic, and the
        // sorted output must stay well-formed.
        if let Ok(mut doc) = parse_str_with_options(s, &opts) {
            if sort::sort_document_by_paths(&mut doc, &[".", "@*"], None).is_ok() {
                let output =
                    serialize_with_options(&doc, &SerializeOptions::default().indent(true));
                assert!(parse_str_with_options(&output, &opts).is_ok());
            }
        }
    }
});
