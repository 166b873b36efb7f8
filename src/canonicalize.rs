use std::collections::HashMap;

use lazy_static::lazy_static;
use serde_json::{json, Map, Value};

use crate::parser::{
    flatten_component_values, AtRule, ComponentValue, DeclarationListItem, Parser, QualifiedRule,
    Rule, Stylesheet, TokenStream,
};

/// Transformer applied to children an at-rule grammar does not recognise.
/// Returning None records the child as an error instead.
pub type UnknownRuleHandler = fn(&Rule) -> Option<Value>;

/// Declarative grammar for one level of at-rule nesting. The canonicalizer
/// cross-checks a parse tree against a table of these, keyed by `@name`.
#[derive(Clone, Default)]
pub struct Grammar {
    /// The block contents form a declaration list
    pub declarations: bool,
    /// Whether (and how) qualified rules may appear among the children;
    /// None means they may not.
    pub qualified: Option<QualifiedGrammar>,
    /// The children are validated against the top-level grammar
    pub stylesheet: bool,
    /// Recognised at-rule children by `@name`. A None value means the
    /// at-rule is recognised but carries no structured content.
    pub children: HashMap<String, Option<Grammar>>,
    pub unknown: Option<UnknownRuleHandler>,
}

/// Grammar of the qualified rules inside a block: either merely allowed, or
/// themselves structured by a sub-grammar.
#[derive(Clone)]
pub enum QualifiedGrammar {
    Allowed,
    Grammar(Box<Grammar>),
}

impl Grammar {
    fn declarations_only() -> Grammar {
        Grammar {
            declarations: true,
            ..Default::default()
        }
    }

    fn stylesheet_ref() -> Grammar {
        Grammar {
            stylesheet: true,
            ..Default::default()
        }
    }

    fn qualified_declarations() -> Grammar {
        Grammar {
            qualified: Some(QualifiedGrammar::Grammar(Box::new(
                Grammar::declarations_only(),
            ))),
            ..Default::default()
        }
    }
}

/// The sixteen page-margin boxes of `@page`
const MARGIN_BOXES: [&str; 16] = [
    "@top-left-corner",
    "@top-left",
    "@top-center",
    "@top-right",
    "@top-right-corner",
    "@bottom-left-corner",
    "@bottom-left",
    "@bottom-center",
    "@bottom-right",
    "@bottom-right-corner",
    "@left-top",
    "@left-middle",
    "@left-bottom",
    "@right-top",
    "@right-middle",
    "@right-bottom",
];

lazy_static! {
    /// Grammar of the common at-rules, used when no grammar is supplied
    pub static ref DEFAULT_GRAMMAR: Grammar = default_grammar();
}

fn default_grammar() -> Grammar {
    let mut children: HashMap<String, Option<Grammar>> = HashMap::new();

    children.insert("@media".to_string(), Some(Grammar::stylesheet_ref()));
    children.insert("@supports".to_string(), Some(Grammar::stylesheet_ref()));
    children.insert("@scope".to_string(), Some(Grammar::stylesheet_ref()));
    children.insert(
        "@keyframes".to_string(),
        Some(Grammar::qualified_declarations()),
    );
    children.insert("@font-face".to_string(), Some(Grammar::declarations_only()));
    children.insert(
        "@counter-style".to_string(),
        Some(Grammar::declarations_only()),
    );
    children.insert("@viewport".to_string(), Some(Grammar::declarations_only()));
    children.insert("@import".to_string(), None);
    children.insert("@custom-selector".to_string(), None);
    children.insert("@custom-media".to_string(), None);

    let mut feature_values: HashMap<String, Option<Grammar>> = HashMap::new();
    for name in [
        "@stylistic",
        "@styleset",
        "@character-variants",
        "@swash",
        "@ornaments",
        "@annotation",
    ] {
        feature_values.insert(name.to_string(), Some(Grammar::declarations_only()));
    }
    children.insert(
        "@font-feature-values".to_string(),
        Some(Grammar {
            qualified: Some(QualifiedGrammar::Allowed),
            children: feature_values,
            ..Default::default()
        }),
    );

    let mut margin_boxes: HashMap<String, Option<Grammar>> = HashMap::new();
    for name in MARGIN_BOXES {
        margin_boxes.insert(name.to_string(), Some(Grammar::declarations_only()));
    }
    children.insert(
        "@page".to_string(),
        Some(Grammar {
            declarations: true,
            children: margin_boxes,
            ..Default::default()
        }),
    );

    Grammar {
        qualified: Some(QualifiedGrammar::Grammar(Box::new(
            Grammar::declarations_only(),
        ))),
        children,
        ..Default::default()
    }
}

/// Validates a stylesheet against a declarative at-rule grammar and lowers it
/// into plain records. Unrecognised or misplaced children land in per-node
/// `errors` lists; the walk is shallow and never fails.
pub fn canonicalize(
    stylesheet: &Stylesheet,
    grammar: Option<&Grammar>,
    top: Option<&Grammar>,
) -> Value {
    let grammar = grammar.unwrap_or(&DEFAULT_GRAMMAR);
    let top = top.unwrap_or(grammar);

    let (rules, errors) = canonicalize_rules(&stylesheet.rules, grammar, top);

    json!({
        "type": "stylesheet",
        "rules": rules,
        "errors": errors,
    })
}

/// Validates a single rule, treating `grammar` as the grammar of that rule
/// itself.
pub fn canonicalize_rule(rule: &Rule, grammar: Option<&Grammar>, top: Option<&Grammar>) -> Value {
    let grammar = grammar.unwrap_or(&DEFAULT_GRAMMAR);
    let top = top.unwrap_or(grammar);

    match rule {
        Rule::AtRule(at_rule) => canonicalize_at_rule(at_rule, Some(grammar), top),
        Rule::QualifiedRule(qualified_rule) => {
            canonicalize_qualified_rule(qualified_rule, Some(grammar), top)
        }
    }
}

fn canonicalize_rules(
    rules: &[Rule],
    grammar: &Grammar,
    top: &Grammar,
) -> (Vec<Value>, Vec<Value>) {
    let mut out = Vec::new();
    let mut errors = Vec::new();

    for rule in rules {
        match rule {
            Rule::QualifiedRule(qualified_rule) => match &grammar.qualified {
                Some(QualifiedGrammar::Allowed) => {
                    out.push(canonicalize_qualified_rule(qualified_rule, None, top));
                }
                Some(QualifiedGrammar::Grammar(sub)) => {
                    out.push(canonicalize_qualified_rule(qualified_rule, Some(sub), top));
                }
                None => errors.push(json!({
                    "error": "unexpected qualified rule",
                    "rule": rule.to_json(),
                })),
            },
            Rule::AtRule(at_rule) => {
                canonicalize_at_rule_child(at_rule, rule, grammar, top, &mut out, &mut errors);
            }
        }
    }

    (out, errors)
}

fn canonicalize_at_rule_child(
    at_rule: &AtRule,
    rule: &Rule,
    grammar: &Grammar,
    top: &Grammar,
    out: &mut Vec<Value>,
    errors: &mut Vec<Value>,
) {
    let key = format!("@{}", at_rule.name.to_ascii_lowercase());

    match grammar.children.get(&key) {
        Some(sub) => out.push(canonicalize_at_rule(at_rule, sub.as_ref(), top)),
        None => match grammar.unknown.and_then(|handler| handler(rule)) {
            Some(value) => out.push(value),
            None => errors.push(json!({
                "error": format!("unrecognized rule {key}"),
                "rule": rule.to_json(),
            })),
        },
    }
}

fn canonicalize_at_rule(at_rule: &AtRule, grammar: Option<&Grammar>, top: &Grammar) -> Value {
    let mut record = Map::new();
    record.insert("type".to_string(), json!("at-rule"));
    record.insert("name".to_string(), json!(at_rule.name.to_ascii_lowercase()));
    record.insert(
        "prelude".to_string(),
        json!(at_rule
            .prelude
            .iter()
            .map(ComponentValue::to_json)
            .collect::<Vec<_>>()),
    );

    // a rule that is recognised but unstructured stays shallow
    let Some(grammar) = grammar else {
        return Value::Object(record);
    };
    let grammar = if grammar.stylesheet { top } else { grammar };

    match &at_rule.block {
        None => {
            record.insert(
                "errors".to_string(),
                json!([{"error": "missing block"}]),
            );
        }
        Some(block) => analyze_block(&block.value, grammar, top, &mut record),
    }

    Value::Object(record)
}

fn canonicalize_qualified_rule(
    qualified_rule: &QualifiedRule,
    grammar: Option<&Grammar>,
    top: &Grammar,
) -> Value {
    let mut record = Map::new();
    record.insert("type".to_string(), json!("qualified-rule"));
    record.insert(
        "prelude".to_string(),
        json!(qualified_rule
            .prelude
            .iter()
            .map(ComponentValue::to_json)
            .collect::<Vec<_>>()),
    );

    if let Some(grammar) = grammar {
        let grammar = if grammar.stylesheet { top } else { grammar };
        analyze_block(&qualified_rule.block.value, grammar, top, &mut record);
    }

    Value::Object(record)
}

/// Re-parses block contents according to the grammar: either as a
/// declaration list (with at-rules validated against the grammar's children)
/// or as a nested rule list.
fn analyze_block(
    values: &[ComponentValue],
    grammar: &Grammar,
    top: &Grammar,
    record: &mut Map<String, Value>,
) {
    let stream = TokenStream::new(flatten_component_values(values));
    let mut parser = Parser::new(stream);

    if grammar.declarations {
        let mut declarations = Map::new();
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for item in parser.parse_list_of_declarations() {
            match item {
                DeclarationListItem::Declaration(declaration) => {
                    // a repeated name keeps the last declaration
                    declarations.insert(declaration.name.clone(), declaration.to_json());
                }
                DeclarationListItem::AtRule(at_rule) => {
                    let rule = Rule::AtRule(at_rule.clone());
                    canonicalize_at_rule_child(
                        &at_rule,
                        &rule,
                        grammar,
                        top,
                        &mut rules,
                        &mut errors,
                    );
                }
            }
        }

        record.insert("declarations".to_string(), Value::Object(declarations));
        record.insert("rules".to_string(), json!(rules));
        record.insert("errors".to_string(), json!(errors));
    } else {
        let nested = parser.parse_list_of_rules();
        let (rules, errors) = canonicalize_rules(&nested, grammar, top);

        record.insert("rules".to_string(), json!(rules));
        record.insert("errors".to_string(), json!(errors));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Stylesheet {
        Parser::from_source(input).parse_stylesheet()
    }

    #[test]
    fn qualified_rules_get_declaration_maps() {
        let stylesheet = parse("a { color: red; color: lime }");
        let canonical = canonicalize(&stylesheet, None, None);

        assert_eq!(canonical["type"], "stylesheet");
        assert_eq!(canonical["errors"], json!([]));

        let rule = &canonical["rules"][0];
        assert_eq!(rule["type"], "qualified-rule");
        // the later declaration wins
        assert_eq!(
            rule["declarations"]["color"]["value"][1]["value"],
            "lime"
        );
    }

    #[test]
    fn media_blocks_validate_against_the_top_grammar() {
        let stylesheet = parse("@media print { a { color: red } }");
        let canonical = canonicalize(&stylesheet, None, None);

        let media = &canonical["rules"][0];
        assert_eq!(media["type"], "at-rule");
        assert_eq!(media["name"], "media");
        assert_eq!(media["rules"][0]["type"], "qualified-rule");
        assert!(media["rules"][0]["declarations"]["color"].is_object());
    }

    #[test]
    fn import_is_recognised_but_unstructured() {
        let stylesheet = parse("@import \"a.css\";");
        let canonical = canonicalize(&stylesheet, None, None);

        let import = &canonical["rules"][0];
        assert_eq!(import["name"], "import");
        assert!(import.get("rules").is_none());
        assert!(import.get("declarations").is_none());
        assert!(import.get("errors").is_none());
    }

    #[test]
    fn keyframes_use_their_own_qualified_grammar() {
        let stylesheet = parse("@keyframes spin { from { left: 0 } to { left: 100px } }");
        let canonical = canonicalize(&stylesheet, None, None);

        let keyframes = &canonical["rules"][0];
        assert_eq!(keyframes["name"], "keyframes");
        assert_eq!(keyframes["rules"][0]["type"], "qualified-rule");
        assert!(keyframes["rules"][0]["declarations"]["left"].is_object());
        assert!(keyframes["rules"][1]["declarations"]["left"].is_object());
    }

    #[test]
    fn page_margin_boxes_are_recognised() {
        let stylesheet = parse("@page { margin: 1cm; @top-center { content: none } }");
        let canonical = canonicalize(&stylesheet, None, None);

        let page = &canonical["rules"][0];
        assert_eq!(page["name"], "page");
        assert!(page["declarations"]["margin"].is_object());
        assert_eq!(page["rules"][0]["name"], "top-center");
        assert!(page["rules"][0]["declarations"]["content"].is_object());
    }

    #[test]
    fn unrecognised_at_rules_become_errors() {
        let stylesheet = parse("@frobnicate { a: b }");
        let canonical = canonicalize(&stylesheet, None, None);

        assert_eq!(canonical["rules"], json!([]));
        assert_eq!(
            canonical["errors"][0]["error"],
            "unrecognized rule @frobnicate"
        );
    }

    #[test]
    fn missing_blocks_are_reported() {
        let stylesheet = parse("@media print;");
        let canonical = canonicalize(&stylesheet, None, None);

        let media = &canonical["rules"][0];
        assert_eq!(media["errors"][0]["error"], "missing block");
    }

    #[test]
    fn unknown_handler_can_adopt_rules() {
        fn adopt(rule: &Rule) -> Option<Value> {
            match rule {
                Rule::AtRule(at_rule) => Some(json!({"type": "adopted", "name": at_rule.name})),
                Rule::QualifiedRule(_) => None,
            }
        }

        let mut grammar = DEFAULT_GRAMMAR.clone();
        grammar.unknown = Some(adopt);

        let stylesheet = parse("@frobnicate { a: b }");
        let canonical = canonicalize(&stylesheet, Some(&grammar), None);

        assert_eq!(canonical["errors"], json!([]));
        assert_eq!(canonical["rules"][0]["type"], "adopted");
        assert_eq!(canonical["rules"][0]["name"], "frobnicate");
    }

    #[test]
    fn font_feature_values_allow_shallow_qualified_rules() {
        let stylesheet =
            parse("@font-feature-values Otaru { @styleset { nice-style: 12 } }");
        let canonical = canonicalize(&stylesheet, None, None);

        let ffv = &canonical["rules"][0];
        assert_eq!(ffv["name"], "font-feature-values");
        assert_eq!(ffv["rules"][0]["name"], "styleset");
        assert!(ffv["rules"][0]["declarations"]["nice-style"].is_object());
    }
}
