// Search and Filter Contract Tests
//
// These tests pin the query-layer invariants: filters are independent
// AND-predicates (order cannot matter), combined search without inputs is
// the identity, and empty inputs yield empty outputs, never errors.

use aio_library::{ToolFilter, ToolInfo, ToolSearchEngine};
use serde_json::json;

fn tool(id: &str, name: &str) -> ToolInfo {
    ToolInfo {
        id: id.to_string(),
        name: name.to_string(),
        ..ToolInfo::default()
    }
}

fn fixture() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            category: "Streaming".to_string(),
            tags: vec!["server".to_string()],
            platforms: vec!["linux".to_string(), "windows".to_string()],
            trust_score: Some(9.0),
            validated: true,
            size: 10 * 1024 * 1024,
            description: "Self-hosted game stream server".to_string(),
            ..tool("sunshine-server", "Sunshine Server")
        },
        ToolInfo {
            category: "Drivers".to_string(),
            tags: vec!["display".to_string()],
            platforms: vec!["windows".to_string()],
            trust_score: Some(6.0),
            size: 2 * 1024 * 1024,
            description: "Virtual display driver".to_string(),
            ..tool("virtual-display", "Virtual Display")
        },
        ToolInfo {
            category: "Utilities".to_string(),
            tags: vec!["scripts".to_string()],
            platforms: vec!["all".to_string()],
            trust_score: Some(4.0),
            size: 300 * 1024,
            description: "Assorted helper scripts".to_string(),
            ..tool("helper-scripts", "Helper Scripts")
        },
    ]
}

/// WHY: Filters are independent AND-predicates, so the result set must
/// not depend on the order filter keys appear in the spec.
#[test]
fn filters_are_order_independent() {
    let mut filter = ToolFilter::new();
    let tools = fixture();

    let forward = filter.apply_filters(
        &tools,
        &json!({"trust_score_min": 5.0, "platforms": ["windows"], "max_size": "5MB"}),
    );
    filter.clear_cache();
    let reversed = filter.apply_filters(
        &tools,
        &json!({"max_size": "5MB", "platforms": ["windows"], "trust_score_min": 5.0}),
    );

    let forward_ids: Vec<&str> = forward.iter().map(|t| t.id.as_str()).collect();
    let reversed_ids: Vec<&str> = reversed.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(forward_ids, reversed_ids);
    assert_eq!(forward_ids, vec!["virtual-display"]);
}

/// WHY: The spec's three-tool scenario: trust floor plus platform filter
/// narrows to exactly the one qualifying tool.
#[test]
fn trust_and_platform_narrow_to_one() {
    let mut filter = ToolFilter::new();
    let result = filter.apply_filters(
        &fixture(),
        &json!({"trust_score_min": 8.0, "platforms": ["linux"]}),
    );

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, "sunshine-server");
}

/// WHY: combined_search with no query and no filters must return the
/// full input unmodified - it is the neutral element callers build on.
#[test]
fn combined_search_without_inputs_is_identity() {
    let mut engine = ToolSearchEngine::new();
    let tools = fixture();

    let result = engine.combined_search(&tools, None, None, None, None, 0.0, true);

    assert_eq!(result.len(), tools.len());
    for (got, expected) in result.iter().zip(&tools) {
        assert_eq!(got.id, expected.id);
    }
}

/// WHY: A partial-name query must find its tool through the substring
/// tier with a score of at least 0.7 - i.e. it must rank as a real
/// match, not a fuzzy afterthought.
#[test]
fn partial_name_query_finds_tool() {
    let mut engine = ToolSearchEngine::new();
    let result = engine.search_by_name(&fixture(), "sunsh", true);

    assert!(!result.is_empty());
    assert_eq!(result[0].id, "sunshine-server");
}

/// WHY: Every filter and search function must map an empty tool list to
/// an empty result, never an error. Empty catalogs are a normal state
/// before the first sync.
#[test]
fn empty_input_yields_empty_output_everywhere() {
    let mut filter = ToolFilter::new();
    let mut engine = ToolSearchEngine::new();
    let none: Vec<ToolInfo> = Vec::new();

    assert!(filter.apply_filters(&none, &json!({"tags": ["x"]})).is_empty());
    assert!(engine.search_by_name(&none, "query", true).is_empty());
    assert!(engine.search_by_description(&none, "query words").is_empty());
    assert!(engine.search_by_tags(&none, &["tag".to_string()]).is_empty());
    assert!(engine.search_by_category(&none, "category").is_empty());
    assert!(engine
        .combined_search(&none, Some("query"), None, None, None, 0.0, true)
        .is_empty());
    assert!(engine.get_search_suggestions(&none, "qu").is_empty());
}

/// WHY: Size strings without a unit suffix parse as raw bytes. Filter
/// specs written with bare numbers-as-strings must behave like byte
/// counts, not silently become zero.
#[test]
fn unitless_size_strings_parse_as_bytes() {
    use aio_library::library::filters::parse_size;

    assert_eq!(parse_size("1024"), 1024);
    assert_eq!(parse_size("0"), 0);

    let mut filter = ToolFilter::new();
    let result = filter.apply_filters(&fixture(), &json!({"max_size": "1048576"}));
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, "helper-scripts");
}

/// WHY: Unknown filter keys must be ignored (availability over
/// strictness), so a newer GUI sending a filter this version does not
/// know cannot blank out the catalog.
#[test]
fn unknown_filter_keys_do_not_narrow() {
    let mut filter = ToolFilter::new();
    let result = filter.apply_filters(
        &fixture(),
        &json!({"sort_by_moon_phase": true, "categories": ["Drivers"]}),
    );

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, "virtual-display");
}

/// WHY: Free-text search is OR'd internally but AND'd against structured
/// filters: a query hit outside the requested category must not survive.
#[test]
fn text_hits_intersect_structured_filters() {
    let mut engine = ToolSearchEngine::new();
    let categories = vec!["Drivers".to_string()];

    // "server" only matches sunshine-server, which is not a Driver
    let result = engine.combined_search(
        &fixture(),
        Some("server"),
        Some(&categories),
        None,
        None,
        0.0,
        true,
    );
    assert!(result.is_empty());

    // "display" matches virtual-display, which is a Driver
    let result = engine.combined_search(
        &fixture(),
        Some("display"),
        Some(&categories),
        None,
        None,
        0.0,
        true,
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, "virtual-display");
}
