//! End-to-end sorting scenarios: load a file, sort, write it back indented.

#![allow(clippy::unwrap_used)]

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use xmlsort::parser::{parse_file, ParseOptions};
use xmlsort::serial::{serialize, serialize_with_options, SerializeOptions};
use xmlsort::sort::{
    self, sort_node, sort_subtree, ExcludeNone, NameComparator, PathKeyComparator, SortAll,
};
use xmlsort::{Document, NodeId};

const DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

const TAG_NAME_INPUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xml>
  <c>masg.</c>
  <a>gast.</a>
  <b>test.</b>
</xml>
"#;

const TARGET_INPUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xml>
  <target>
    <c>masg.</c>
    <b>test.</b>
    <a>gast.</a>
  </target>
  <notarget>
    <b>test.</b>
    <c>masg.</c>
    <a>gast.</a>
  </notarget>
</xml>
"#;

const TARGET_SORTED: &str = "<xml>
    <target>
        <a>gast.</a>
        <b>test.</b>
        <c>masg.</c>
    </target>
</xml>
";

fn load_from(path: &Path, xml: &str) -> Document {
    fs::write(path, xml).unwrap();
    parse_file(path, &ParseOptions::default().no_blanks(true))
        .unwrap_or_else(|e| panic!("load failed: {e}"))
}

fn load(xml: &str) -> (TempDir, Document) {
    let dir = TempDir::new().unwrap();
    let doc = load_from(&dir.path().join("input.xml"), xml);
    (dir, doc)
}

fn pretty(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default().indent(true))
}

fn name_is(name: &'static str) -> impl Fn(&Document, NodeId) -> bool {
    move |doc: &Document, node: NodeId| doc.node_name(node) == name
}

#[test]
fn test_empty_root_element() {
    let (_dir, mut doc) = load("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xml>\n</xml>\n");
    sort::sort_document(&mut doc);
    assert_eq!(pretty(&doc), format!("{DECL}<xml/>\n"));
}

#[test]
fn test_non_ascii_path() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("非asciiパス");
    fs::create_dir(&sub).unwrap();
    let mut doc = load_from(&sub.join("非asciiパス.xml"), "<xml>\n</xml>\n");
    sort::sort_document(&mut doc);
    assert_eq!(pretty(&doc), format!("{DECL}<xml/>\n"));
}

#[test]
fn test_sort_by_tag_name() {
    let (_dir, mut doc) = load(TAG_NAME_INPUT);
    sort::sort_document(&mut doc);
    assert_eq!(
        pretty(&doc),
        format!("{DECL}<xml>\n    <a>gast.</a>\n    <b>test.</b>\n    <c>masg.</c>\n</xml>\n")
    );
}

#[test]
fn test_custom_comparator_descending() {
    let (_dir, mut doc) = load(TAG_NAME_INPUT);
    let descending =
        |doc: &Document, a: NodeId, b: NodeId| -> Ordering { doc.node_name(b).cmp(doc.node_name(a)) };
    let root = doc.root();
    sort_subtree(&mut doc, root, &SortAll, &descending, &ExcludeNone);
    assert_eq!(
        pretty(&doc),
        format!("{DECL}<xml>\n    <c>masg.</c>\n    <b>test.</b>\n    <a>gast.</a>\n</xml>\n")
    );
}

#[test]
fn test_sort_target_predicate() {
    let (_dir, mut doc) = load(TARGET_INPUT);
    let not_notarget = |doc: &Document, node: NodeId| doc.node_name(node) != "notarget";
    let root = doc.root();
    sort_subtree(&mut doc, root, &not_notarget, &NameComparator, &ExcludeNone);
    assert_eq!(
        pretty(&doc),
        format!(
            "{DECL}<xml>
    <notarget>
        <b>test.</b>
        <c>masg.</c>
        <a>gast.</a>
    </notarget>
    <target>
        <a>gast.</a>
        <b>test.</b>
        <c>masg.</c>
    </target>
</xml>
"
        )
    );
}

#[test]
fn test_exclude_predicate() {
    let (_dir, mut doc) = load(TARGET_INPUT);
    let root = doc.root();
    sort_subtree(&mut doc, root, &SortAll, &NameComparator, &name_is("notarget"));
    assert_eq!(pretty(&doc), format!("{DECL}{TARGET_SORTED}"));
}

#[test]
fn test_exclude_xpath_removes_attributes_and_elements() {
    let (_dir, mut doc) = load(
        r#"<xml>
  <target>
    <c id="1">masg.</c>
    <a id="2">gast.</a>
    <b id="0">test.</b>
  </target>
  <notarget>
    <b id="0">test.</b>
  </notarget>
</xml>"#,
    );
    sort::sort_document_by_paths::<&str>(&mut doc, &[], Some("//*/@id|/xml/notarget")).unwrap();
    assert_eq!(pretty(&doc), format!("{DECL}{TARGET_SORTED}"));
}

#[test]
fn test_sort_by_name_then_id() {
    let (_dir, mut doc) = load(
        r#"<xml>
  <target>
    <c id="1">masg.</c>
    <a id="2">gast.</a>
    <b id="0">test.</b>
  </target>
  <notarget>
    <b id="0">test.</b>
    <a id="2">gast.</a>
    <c id="1">masg.</c>
  </notarget>
  <notarget>
    <a id="2">masg.</a>
    <a id="0">test.</a>
    <a id="1">gast.</a>
  </notarget>
</xml>"#,
    );
    sort::sort_document_by_paths(&mut doc, &[".", "@id"], None).unwrap();
    assert_eq!(
        pretty(&doc),
        format!(
            r#"{DECL}<xml>
    <notarget>
        <a id="2">gast.</a>
        <b id="0">test.</b>
        <c id="1">masg.</c>
    </notarget>
    <notarget>
        <a id="0">test.</a>
        <a id="1">gast.</a>
        <a id="2">masg.</a>
    </notarget>
    <target>
        <a id="2">gast.</a>
        <b id="0">test.</b>
        <c id="1">masg.</c>
    </target>
</xml>
"#
        )
    );
}

#[test]
fn test_sort_by_id_with_exclusion() {
    let (_dir, mut doc) = load(
        r#"<xml>
  <notarget>
    <a id="1">x</a>
    <a id="0">y</a>
  </notarget>
  <target>
    <a id="2">gast.</a>
    <a id="0">test.</a>
    <a id="1">masg.</a>
  </target>
</xml>"#,
    );
    sort::sort_document_by_paths(&mut doc, &["./@id"], Some("/xml/notarget")).unwrap();
    assert_eq!(
        pretty(&doc),
        format!(
            r#"{DECL}<xml>
    <target>
        <a id="0">test.</a>
        <a id="1">masg.</a>
        <a id="2">gast.</a>
    </target>
</xml>
"#
        )
    );
}

#[test]
fn test_no_recursion_below_root_element() {
    let (_dir, mut doc) = load(
        "<root>
  <parentb>
    <childb>b</childb>
    <childc>c</childc>
    <childa>a</childa>
  </parentb>
  <parenta>
    <childb>b</childb>
    <childc>c</childc>
    <childa>a</childa>
  </parenta>
</root>",
    );
    let root = doc.root_element().unwrap();
    sort_node(&mut doc, root, false, &SortAll, &NameComparator, &ExcludeNone);
    assert_eq!(
        pretty(&doc),
        format!(
            "{DECL}<root>
    <parenta>
        <childb>b</childb>
        <childc>c</childc>
        <childa>a</childa>
    </parenta>
    <parentb>
        <childb>b</childb>
        <childc>c</childc>
        <childa>a</childa>
    </parentb>
</root>
"
        )
    );
}

#[test]
fn test_sorting_is_idempotent() {
    let (_dir, mut doc) = load(TARGET_INPUT);
    sort::sort_document_by_paths(&mut doc, &[".", "./text()"], None).unwrap();
    let once = pretty(&doc);
    sort::sort_document_by_paths(&mut doc, &[".", "./text()"], None).unwrap();
    assert_eq!(pretty(&doc), once);
}

#[test]
fn test_equal_keys_keep_document_order() {
    let (_dir, mut doc) = load("<r><x n='3'/><x n='1'/><x n='2'/></r>");
    // Every sibling has the same name, so nothing moves.
    sort::sort_document(&mut doc);
    assert_eq!(
        serialize(&doc),
        format!("{DECL}<r><x n=\"3\"/><x n=\"1\"/><x n=\"2\"/></r>\n")
    );
}

#[test]
fn test_exclusion_only_removes() {
    let xml = "<r><d/><b/><c/><a/></r>";
    let (_dir, mut with) = load(xml);
    let (_dir2, mut without) = load(xml);

    let root = with.root();
    sort_subtree(&mut with, root, &SortAll, &NameComparator, &name_is("c"));
    sort::sort_document(&mut without);

    assert_eq!(serialize(&with), format!("{DECL}<r><a/><b/><d/></r>\n"));
    assert_eq!(serialize(&without), format!("{DECL}<r><a/><b/><c/><d/></r>\n"));
}

#[test]
fn test_mixed_kinds_ordered_by_kind_first() {
    let (_dir, mut doc) = load("<r><!--c-->t<b/><?pi x?><a/></r>");
    let keys = PathKeyComparator::new(&["."]).unwrap();
    let root = doc.root();
    sort_subtree(&mut doc, root, &SortAll, &keys, &ExcludeNone);
    assert_eq!(
        serialize(&doc),
        format!("{DECL}<r><a/><b/>t<?pi x?><!--c--></r>\n")
    );
}

#[test]
fn test_invalid_sort_key_leaves_document_untouched() {
    let (_dir, mut doc) = load("<r><b/><a/></r>");
    let err = sort::sort_document_by_paths(&mut doc, &["@id", "a[1"], Some("//b")).unwrap_err();
    assert!(err.to_string().contains("'a[1'"), "{err}");
    assert_eq!(serialize(&doc), format!("{DECL}<r><b/><a/></r>\n"));
}

#[test]
fn test_sort_key_missing_on_some_siblings() {
    // Every other sibling has no id, so the key cannot order all pairs.
    let children: String = (0..40)
        .map(|i| {
            if i % 2 == 0 {
                format!("<a id=\"{:02}\">{i}</a>", (i * 13) % 40)
            } else {
                format!("<a>{i}</a>")
            }
        })
        .collect();
    let (_dir, mut doc) = load(&format!("<r>{children}</r>"));
    sort::sort_document_by_paths(&mut doc, &["@id"], None).unwrap();

    let r = doc.root_element().unwrap();
    let mut texts: Vec<u32> = doc
        .children(r)
        .map(|a| doc.text_content(a).parse().unwrap())
        .collect();
    texts.sort_unstable();
    assert_eq!(texts, (0..40).collect::<Vec<u32>>());
}

#[test]
fn test_sort_key_present_on_all_siblings() {
    let children: String = (0..40)
        .map(|i| format!("<a id=\"{:02}\"/>", (i * 13) % 40))
        .collect();
    let (_dir, mut doc) = load(&format!("<r>{children}</r>"));
    sort::sort_document_by_paths(&mut doc, &["@id"], None).unwrap();

    let r = doc.root_element().unwrap();
    let ids: Vec<&str> = doc
        .children(r)
        .map(|a| doc.attribute(a, "id").unwrap())
        .collect();
    let expected: Vec<String> = (0..40).map(|i| format!("{i:02}")).collect();
    assert_eq!(ids, expected);
}
