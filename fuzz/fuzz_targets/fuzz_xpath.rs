#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlsort::xpath::evaluate;
use xmlsort::Document;

fuzz_target!(|data: &[u8]| {
    if let Ok(expr) = std::str::from_utf8(data) {
        if let Ok(doc) =
            Document::parse_str("<root><child id=\"1\">text<!--c--></child><child/></root>")
        {
            if let Some(root) = doc.root_element() {
                // Compiling and evaluating any expression must not panic.
                let _ = evaluate(&doc, root, expr);
                let _ = evaluate(&doc, doc.root(), expr);
            }
        }
    }
});
