mod common;

use assert2::{check, let_assert};
use common::{fixture_index, fixture_source};
use rstest::rstest;
use searchindex_mcp::index::{
    Dialect, EnvVersion, Objects, Postings, SearchIndex, parse_index, validate,
};
use serde_json::json;

// --- Round trips ---

/// The bundled index was written by the legacy writer and must come back byte for byte.
#[rstest]
fn real_index_round_trips_exactly(fixture_source: String) {
    let (index, dialect) = parse_index(&fixture_source).unwrap();
    check!(dialect == Dialect::Legacy);
    check!(index.to_text(Dialect::Legacy) == fixture_source);
}

#[rstest]
fn json_dialect_preserves_content(fixture_source: String) {
    let (index, _) = parse_index(&fixture_source).unwrap();
    let json_text = index.to_text(Dialect::Json);
    check!(json_text.starts_with(r#"Search.setIndex({"docnames":["#));

    let (reparsed, dialect) = parse_index(&json_text).unwrap();
    check!(dialect == Dialect::Json);
    check!(reparsed == index);
    check!(reparsed.to_text(Dialect::Json) == json_text);
    check!(reparsed.to_text(Dialect::Legacy) == fixture_source);
}

#[test]
fn listed_objects_and_extra_fields_round_trip() {
    let text = r#"Search.setIndex({"alltitles":{"A":[[0,null]]},"docnames":["a"],"envversion":{"sphinx":61},"objects":{"":[[0,0,1,"-","spoiler"]]},"objnames":{"0":["rst","directive","reStructuredText directive"]},"objtypes":{"0":"rst:directive"},"terms":{"foo":[[0,3,1,"sec-foo"]]},"titles":["A"]})"#;
    let (index, dialect) = parse_index(text).unwrap();
    check!(dialect == Dialect::Json);
    let_assert!(Some(Objects::Listed(_)) = &index.objects);
    check!(index.extra.contains_key("alltitles"));
    check!(index.to_text(Dialect::Json) == text);

    let spoilers = index.resolve_object("spoiler");
    let_assert!([spoiler] = spoilers.as_slice());
    check!(spoiler.anchor == "directive-spoiler");

    let hits = index.lookup_term("foo");
    let_assert!([hit] = hits.as_slice());
    check!(hit.posting.weight() == 3);
    check!(hit.posting.anchor() == "sec-foo");
}

#[test]
fn envversion_without_sphinx_entry_warns() {
    let index = SearchIndex::from_value(&json!({
        "docnames": ["a"],
        "titles": ["A"],
        "terms": {},
        "envversion": {"sphinx.domains.std": 2}
    }))
    .unwrap();
    let report = validate(&index);
    check!(report.is_valid());
    check!(report.warnings == vec!["envversion has no 'sphinx' entry".to_string()]);
}

// --- Model ---

#[rstest]
fn real_index_shape(fixture_index: SearchIndex) {
    check!(fixture_index.docnames.len() == 11);
    check!(fixture_index.titles.len() == 11);
    check!(fixture_index.filenames.as_ref().map(Vec::len) == Some(11));
    check!(fixture_index.docnames[0] == "README");
    check!(fixture_index.titles[5] == "minicylc");
    let_assert!(Some(EnvVersion::Extensions(versions)) = &fixture_index.envversion);
    check!(versions.get("sphinx") == Some(&56));
    let_assert!(Some(Objects::Named(_)) = &fixture_index.objects);
}

#[rstest]
fn real_index_is_valid(fixture_index: SearchIndex) {
    let report = validate(&fixture_index);
    check!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    check!(report.warnings.is_empty());
}

#[rstest]
fn all_posting_encodings_present(fixture_index: SearchIndex) {
    let_assert!(Some(Postings::Single(5)) = fixture_index.terms.get("graph"));
    let_assert!(Some(Postings::List(docs)) = fixture_index.terms.get("theme"));
    check!(docs == &vec![4, 5, 8]);
}

// --- Lookups ---

/// A lookup of "foo" resolves to document "a" titled "A".
#[test]
fn sample_lookup_scenario() {
    let index = SearchIndex::from_value(&json!({
        "docnames": ["a", "b"],
        "titles": ["A", "B"],
        "terms": {"foo": [[0, 1, 1, ""]]}
    }))
    .unwrap();

    let hits = index.lookup_term("foo");
    let_assert!([hit] = hits.as_slice());
    check!(hit.document.docname == "a");
    check!(hit.document.title == "A");
    check!(hit.posting.weight() == 1);
    check!(hit.posting.flags() == 1);
    check!(validate(&index).is_valid());
}

#[rstest]
fn title_and_body_lookups(fixture_index: SearchIndex) {
    let title_hits = fixture_index.lookup_title_term("configur");
    let_assert!([hit] = title_hits.as_slice());
    check!(hit.document.docname == "extensions/cylc.sphinx_ext.minicylc");

    let body_hits = fixture_index.lookup_term("configur");
    check!(body_hits.len() == 7);
    check!(body_hits.iter().all(|h| h.document.doc != 5));
}

#[rstest]
#[case("cylc.sphinx_ext.minicylc", "module-cylc.sphinx_ext.minicylc", "py:module")]
#[case("minicylc", "directive-minicylc", "rst:directive")]
#[case("minicylc:theme", "directive-option-minicylc-theme", "rst:directive:option")]
#[case("boolean", "boolean", "parsec:type")]
#[case("my-conf1.cylc[bar]pub=integer", "my-conf1.cylc[bar]pub=integer", "cylc:value")]
fn object_resolution(
    fixture_index: SearchIndex,
    #[case] name: &str,
    #[case] anchor: &str,
    #[case] objtype: &str,
) {
    let objects = fixture_index.resolve_object(name);
    let_assert!([object] = objects.as_slice());
    check!(object.anchor == anchor);
    check!(object.objtype == Some(objtype));
}

#[rstest]
fn summary_of_real_index(fixture_index: SearchIndex) {
    let summary = fixture_index.summary();
    check!(summary.documents == 11);
    check!(summary.title_terms == 32);
    check!(summary.objects_by_type.get("py:module") == Some(&9));
    check!(summary.objects_by_type.get("cylc:value") == Some(&2));
}

// --- Reader errors ---

#[rstest]
#[case("Search.setIndex({docnames:[})", 1)]
#[case("Search.setIndex({a:1,\na:2})", 2)]
#[case("{\"docnames\": [\"a\"],\n\"titles\": [\"A\"],\n\"terms\": {\"x\": tru}}", 3)]
fn parse_errors_report_line(#[case] text: &str, #[case] line: usize) {
    let_assert!(Err(err) = parse_index(text));
    check!(err.to_string().contains(&format!("line {}", line)));
}

#[test]
fn missing_required_field_is_a_model_error() {
    let_assert!(Err(err) = parse_index(r#"Search.setIndex({docnames:["a"],titles:["A"]})"#));
    check!(err.to_string().contains("terms"));
}
