use pretty_assertions::assert_eq;

use super::parse;

// Helper function to parse an expression and render its tree.
//
// We test precedence by comparing whether two expressions parenthesized in
// different ways yield the same canonical rendering.
fn ast(source: &str) -> String {
    let ast = parse(source)
        .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e));
    ast.print(ast.root())
}

#[test]
fn test_addition_vs_subtraction() {
    assert_eq!(ast("a + b - c"), ast("(a + b) - c"));
    assert_eq!(ast("a - b + c"), ast("(a - b) + c"));
    assert_eq!(
        ast("a + b - c + d - e + f"),
        ast("((((a + b) - c) + d) - e) + f")
    );
    assert_eq!(ast("a - (b + c)"), "a - (b + c)");
}

#[test]
fn test_multiplication_vs_division() {
    assert_eq!(ast("a * b / c"), ast("(a * b) / c"));
    assert_eq!(ast("a / b * c"), ast("(a / b) * c"));
    assert_eq!(ast("a % b * c"), ast("(a % b) * c"));
}

#[test]
fn test_addition_vs_multiplication() {
    assert_eq!(ast("a + b * c"), ast("a + (b * c)"));
    assert_eq!(ast("a * b + c"), ast("(a * b) + c"));
    assert_eq!(ast("(a + b) * c"), "(a + b) * c");
}

#[test]
fn test_and_vs_or() {
    assert_eq!(ast("a and b or c"), ast("(a && b) || c"));
    assert_eq!(ast("a or b and c"), ast("a || (b && c)"));
    assert_eq!(ast("a || b && c"), "a || b && c");
}

#[test]
fn test_unary_vs_binary() {
    assert_eq!(ast("--a"), ast("-(-a)"));
    assert_eq!(ast("-a + b"), ast("(-a) + b"));
    assert_eq!(ast("a + -b"), ast("a + (-b)"));
    assert_eq!(ast("not a and b"), ast("(!a) && b"));
    assert_eq!(ast("!a == b"), ast("(!a) == b"));
}

#[test]
fn test_exponentiation() {
    assert_eq!(ast("a ** b ** c"), ast("a ** (b ** c)"));
    assert_eq!(ast("a ^ b ^ c ^ d"), ast("a ** (b ** (c ** d))"));
    assert_eq!(ast("a * b ^ c"), ast("a * (b ^ c)"));
}

#[test]
fn test_exponentiation_vs_negation() {
    // Unary operators bind tighter than `**`.
    assert_eq!(ast("-a ** b"), ast("(-a) ** b"));
    assert_eq!(ast("a ** -b"), ast("a ** (-b)"));
    assert_eq!(ast("-(a ** b)"), "-(a ** b)");
}

#[test]
fn test_range_vs_arithmetic() {
    assert_eq!(ast("1 + a .. b * 2"), ast("(1 + a) .. (b * 2)"));
    assert_eq!(ast("x in 1..10"), ast("x in (1..10)"));
}

#[test]
fn test_comparison_vs_logical() {
    assert_eq!(ast("a < b && c >= d"), ast("(a < b) && (c >= d)"));
    assert_eq!(ast("a == b || c != d"), ast("(a == b) || (c != d)"));
}

#[test]
fn test_in_operator() {
    assert_eq!(ast("a in b and c"), ast("(a in b) and c"));
    assert_eq!(ast("a not in b or c"), ast("(a not in b) or c"));
    assert_eq!(ast("a + 1 in b"), ast("(a + 1) in b"));
    assert_eq!(ast("not a in b"), ast("(not a) in b"));
}

#[test]
fn test_string_operators() {
    assert_eq!(ast("a matches b && c"), ast("(a matches b) && c"));
    assert_eq!(ast("a + b contains c"), ast("(a + b) contains c"));
    assert_eq!(ast("a not startsWith b"), ast("!(a startsWith b)"));
}

#[test]
fn test_nil_coalescing() {
    assert_eq!(ast("a ?? b ?? c"), ast("a ?? (b ?? c)"));
    assert_eq!(ast("a ?? b || c"), ast("a ?? (b || c)"));
    assert_eq!(ast("a ?? b ? c : d"), ast("(a ?? b) ? c : d"));
}

#[test]
fn test_ternary_vs_binary() {
    assert_eq!(ast("a ? b + c : d"), ast("a ? (b + c) : d"));
    assert_eq!(ast("a ? b : c + d"), ast("a ? b : (c + d)"));
    assert_eq!(ast("a || b ? c : d"), ast("(a || b) ? c : d"));
    assert_eq!(ast("a ? b : c ? d : e"), ast("a ? b : (c ? d : e)"));
}

#[test]
fn test_pipeline_is_lowest() {
    assert_eq!(ast("a + b | f(c)"), ast("f(a + b, c)"));
    assert_eq!(ast("xs | filter(# > 1) | map(# * 2)"), ast("map(filter(xs, # > 1), # * 2)"));
}

#[test]
fn test_postfix_vs_binary() {
    assert_eq!(ast("a.b + c[0]"), ast("(a.b) + (c[0])"));
    assert_eq!(ast("-a.b"), ast("-(a.b)"));
    assert_eq!(ast("f(x) * 2"), ast("(f(x)) * 2"));
}

#[test]
fn test_excessive_parentheses() {
    assert_eq!(ast("((((a))))"), ast("a"));
    assert_eq!(ast("((a + (b)))"), ast("a + b"));
}

#[test]
fn test_let_body_extends_right() {
    assert_eq!(ast("let x = 1; x + 2"), ast("let x = 1; (x + 2)"));
    assert_eq!(ast("let x = a ? 1 : 2; x"), "let x = a ? 1 : 2; x");
}
