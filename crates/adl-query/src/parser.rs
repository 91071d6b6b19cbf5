//! Query text parser.
//!
//! Python-flavoured expressions:
//! - `EventDataset().Select(e => e.Jets("AntiKt4EMTopoJets"))`
//! - `Select(lambda e: e.EventInfo("EventInfo").runNumber())`
//! - `j.pt() / 1000.0 if j.eta() > 0 else -1.0`
//! - `{'pt': j.pt(), 'eta': j.eta()}`
//!
//! Lambdas are written `x => body`, `(a, b) => body` or `lambda x: body`.

use crate::ast::{BinaryOp, Constant, Expr, UnaryOp};
use crate::error::ParseError;
use chumsky::extra;
use chumsky::prelude::*;

/// Extra type for parsers - uses Rich errors for better messages
pub type Extra<'src> = extra::Err<Rich<'src, char>>;

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "if", "else", "lambda", "True", "False", "None",
];

// ============================================================================
// Primitive parsers
// ============================================================================

/// Identifier, keywords included: used after `.`
pub fn raw_ident<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
        .map(|s: &str| s.to_string())
        .labelled("identifier")
}

/// Identifier that is not a keyword
pub fn ident<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    raw_ident().try_map(|name, span| {
        if KEYWORDS.contains(&name.as_str()) {
            Err(Rich::custom(span, format!("'{}' is a keyword", name)))
        } else {
            Ok(name)
        }
    })
}

/// Backslash escape inside a string literal. Unknown escapes keep the
/// escaped character.
fn escape<'src>() -> impl Parser<'src, &'src str, char, Extra<'src>> + Clone {
    just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('r').to('\r'),
        just('0').to('\0'),
        any(),
    )))
}

/// Parser for single-quoted string literals: 'value'
pub fn single_quoted_string<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of("'\\")
        .or(escape())
        .repeated()
        .collect::<String>()
        .delimited_by(just('\''), just('\''))
        .labelled("single-quoted string")
}

/// Parser for double-quoted string literals: "value"
pub fn double_quoted_string<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of("\"\\")
        .or(escape())
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .labelled("double-quoted string")
}

/// Parser for string literals (single or double quoted)
pub fn string_literal<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    single_quoted_string()
        .or(double_quoted_string())
        .labelled("string literal")
}

/// Integer or float: `42`, `1000.0`, `1e3`
pub fn number<'src>() -> impl Parser<'src, &'src str, Constant, Extra<'src>> + Clone {
    let digits = any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1);
    let fraction = just('.').then(digits.clone());
    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(digits.clone());

    digits
        .then(fraction.or_not())
        .then(exponent.or_not())
        .to_slice()
        .try_map(|s: &str, span| {
            if s.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
                s.parse::<f64>()
                    .map(Constant::Float)
                    .map_err(|_| Rich::custom(span, "invalid float"))
            } else {
                s.parse::<i64>()
                    .map(Constant::Int)
                    .map_err(|_| Rich::custom(span, "integer overflow"))
            }
        })
        .labelled("number")
}

/// Keyword parser
pub fn kw<'src>(keyword: &'static str) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    text::keyword::<&str, _, Extra<'src>>(keyword).ignored()
}

// ============================================================================
// Expressions
// ============================================================================

enum Postfix {
    Attr(String),
    Call(Vec<Expr>),
    Index(Expr),
}

fn binop(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::binop(op, left, right)
}

/// Full expression parser, loosest binding first: lambda, conditional,
/// `or`, `and`, `not`, comparison, `+ -`, `* / // %`, unary sign, postfix.
pub fn expr<'src>() -> impl Parser<'src, &'src str, Expr, Extra<'src>> + Clone {
    recursive(|expr| {
        let items = expr
            .clone()
            .separated_by(just(',').padded())
            .allow_trailing()
            .collect::<Vec<_>>();

        let params = ident()
            .padded()
            .separated_by(just(','))
            .collect::<Vec<_>>();

        // x => body, (a, b) => body
        let arrow_lambda = choice((
            params
                .clone()
                .delimited_by(just('('), just(')')),
            ident().map(|p| vec![p]),
        ))
        .then_ignore(just("=>").padded())
        .then(expr.clone())
        .map(|(params, body)| Expr::lambda(params, body))
        .labelled("lambda like x => x.pt()");

        // lambda x: body
        let keyword_lambda = kw("lambda")
            .ignore_then(params.clone())
            .then_ignore(just(':').padded())
            .then(expr.clone())
            .map(|(params, body)| Expr::lambda(params, body))
            .labelled("lambda like lambda x: x.pt()");

        let constant = choice((
            kw("True").to(Expr::Constant(Constant::Bool(true))),
            kw("False").to(Expr::Constant(Constant::Bool(false))),
            kw("None").to(Expr::Constant(Constant::None)),
            number().map(Expr::Constant),
            string_literal().map(Expr::string),
        ));

        // (), (a), (a,), (a, b)
        let parens = expr
            .clone()
            .then(just(',').padded().ignore_then(items.clone()).or_not())
            .or_not()
            .delimited_by(just('(').padded(), just(')'))
            .map(|inner| match inner {
                None => Expr::Tuple(Vec::new()),
                Some((first, None)) => first,
                Some((first, Some(rest))) => {
                    Expr::Tuple(std::iter::once(first).chain(rest).collect())
                }
            });

        let list = items
            .clone()
            .delimited_by(just('[').padded(), just(']'))
            .map(Expr::List);

        let dict = expr
            .clone()
            .then_ignore(just(':').padded())
            .then(expr.clone())
            .separated_by(just(',').padded())
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just('{').padded(), just('}'))
            .map(Expr::Dict)
            .labelled("dict like {'pt': j.pt()}");

        let atom = choice((
            arrow_lambda,
            keyword_lambda,
            constant,
            parens,
            list,
            dict,
            ident().map(Expr::Name),
        ))
        .padded()
        .boxed();

        let postfix_op = choice((
            just('.')
                .padded()
                .ignore_then(raw_ident())
                .map(Postfix::Attr),
            items
                .clone()
                .delimited_by(just('(').padded(), just(')'))
                .map(Postfix::Call),
            expr.clone()
                .delimited_by(just('[').padded(), just(']'))
                .map(Postfix::Index),
        ))
        .padded();

        let postfix = atom
            .foldl(postfix_op.repeated(), |value, op| match op {
                Postfix::Attr(attr) => Expr::attr(value, attr),
                Postfix::Call(args) => Expr::call(value, args),
                Postfix::Index(index) => Expr::Subscript {
                    value: Box::new(value),
                    index: Box::new(index),
                },
            })
            .boxed();

        // a ** b ** c groups as a ** (b ** c)
        let power = postfix
            .clone()
            .then(
                just("**")
                    .padded()
                    .ignore_then(postfix)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(base, exponents)| {
                let mut chain = exponents.into_iter().rev();
                match chain.next() {
                    None => base,
                    Some(last) => {
                        let exponent =
                            chain.fold(last, |right, left| binop(BinaryOp::Pow, left, right));
                        binop(BinaryOp::Pow, base, exponent)
                    }
                }
            })
            .boxed();

        let unary = choice((just('-').to(UnaryOp::Neg), just('+').to(UnaryOp::Pos)))
            .padded()
            .repeated()
            .foldr(power, |op, operand| Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            })
            .boxed();

        let product_op = choice((
            just("//").to(BinaryOp::FloorDiv),
            just('*').to(BinaryOp::Mult),
            just('/').to(BinaryOp::Div),
            just('%').to(BinaryOp::Mod),
        ))
        .padded();
        let product = unary
            .clone()
            .foldl(product_op.then(unary).repeated(), |left, (op, right)| {
                binop(op, left, right)
            })
            .boxed();

        let sum_op = choice((just('+').to(BinaryOp::Add), just('-').to(BinaryOp::Sub))).padded();
        let sum = product
            .clone()
            .foldl(sum_op.then(product).repeated(), |left, (op, right)| {
                binop(op, left, right)
            })
            .boxed();

        let cmp_op = choice((
            just("==").to(BinaryOp::Eq),
            just("!=").to(BinaryOp::NotEq),
            just("<=").to(BinaryOp::Le),
            just(">=").to(BinaryOp::Ge),
            just('<').to(BinaryOp::Lt),
            just('>').to(BinaryOp::Gt),
        ))
        .padded();
        let comparison = sum
            .clone()
            .foldl(cmp_op.then(sum).repeated(), |left, (op, right)| {
                binop(op, left, right)
            })
            .boxed();

        let not = kw("not")
            .padded()
            .repeated()
            .foldr(comparison, |_, operand| Expr::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            })
            .boxed();

        let and = not
            .clone()
            .foldl(
                kw("and").padded().ignore_then(not).repeated(),
                |left, right| binop(BinaryOp::And, left, right),
            )
            .boxed();

        let or = and
            .clone()
            .foldl(
                kw("or").padded().ignore_then(and).repeated(),
                |left, right| binop(BinaryOp::Or, left, right),
            )
            .boxed();

        // body if test else orelse
        or.clone()
            .then(
                kw("if")
                    .padded()
                    .ignore_then(or)
                    .then_ignore(kw("else").padded())
                    .then(expr)
                    .or_not(),
            )
            .map(|(body, conditional)| match conditional {
                None => body,
                Some((test, orelse)) => Expr::IfExpr {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
            })
    })
}

/// Parse a complete query
pub fn parse_query(input: &str) -> Result<Expr, ParseError> {
    expr()
        .padded()
        .then_ignore(end())
        .parse(input)
        .into_result()
        .map_err(|errs| ParseError::Syntax {
            message: format_errors(&errs, input),
        })
}

// ============================================================================
// Error formatting
// ============================================================================

/// Format chumsky errors with line and column
pub fn format_errors(errs: &[Rich<'_, char>], input: &str) -> String {
    errs.iter()
        .map(|e| {
            let start = e.span().start;
            let line = input[..start].matches('\n').count() + 1;
            let col = start - input[..start].rfind('\n').map_or(0, |i| i + 1);

            let found = e
                .found()
                .map_or("end of input".to_string(), |c| format!("'{}'", c));

            format!(
                "Line {}, column {}: {} (found {})",
                line,
                col + 1,
                e.reason(),
                found
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parse(text: &str) -> String {
        parse_query(text).unwrap().to_string()
    }

    #[test]
    fn test_ident_rejects_keywords() {
        assert!(ident().parse("and").into_result().is_err());
        assert_eq!(ident().parse("android").into_result().unwrap(), "android");
    }

    #[test_case("42", Constant::Int(42) ; "int")]
    #[test_case("1000.0", Constant::Float(1000.0) ; "float")]
    #[test_case("1e3", Constant::Float(1000.0) ; "exponent")]
    fn test_number(text: &str, expected: Constant) {
        assert_eq!(number().parse(text).into_result().unwrap(), expected);
    }

    #[test_case("1 + 2 * 3", "(1 + (2 * 3))" ; "product binds tighter")]
    #[test_case("1 - 2 - 3", "((1 - 2) - 3)" ; "left associative")]
    #[test_case("-x.pt()", "(-x.pt())" ; "unary below postfix")]
    #[test_case("a < b and not c or d", "(((a < b) and (not c)) or d)" ; "boolean precedence")]
    #[test_case("a // b % c", "((a // b) % c)" ; "floor div")]
    #[test_case("j.pt() ** 2", "(j.pt() ** 2)" ; "power")]
    #[test_case("a ** b ** c", "(a ** (b ** c))" ; "power right associative")]
    #[test_case("-a ** 2 * 3", "((-(a ** 2)) * 3)" ; "power binds tighter than unary")]
    #[test_case("a if c else b", "(a if c else b)" ; "conditional")]
    #[test_case("x[0].y", "x[0].y" ; "subscript then attribute")]
    fn test_precedence(text: &str, expected: &str) {
        assert_eq!(parse(text), expected);
    }

    #[test_case("x => x.pt()", "x => x.pt()" ; "arrow")]
    #[test_case("lambda x: x.pt()", "x => x.pt()" ; "keyword")]
    #[test_case("(a, b) => a + b", "(a, b) => (a + b)" ; "arrow two params")]
    #[test_case("lambda acc, v: acc + v", "(acc, v) => (acc + v)" ; "keyword two params")]
    fn test_lambda_forms(text: &str, expected: &str) {
        assert_eq!(parse(text), expected);
    }

    #[test]
    fn test_method_chain() {
        let text = r#"EventDataset().Select(lambda e: e.Jets("AntiKt4EMTopoJets").Select(lambda j: j.pt()/1000.0))"#;
        assert_eq!(
            parse(text),
            r#"EventDataset().Select(e => e.Jets("AntiKt4EMTopoJets").Select(j => (j.pt() / 1000.0)))"#
        );
    }

    #[test]
    fn test_collections() {
        assert_eq!(parse("()"), "()");
        assert_eq!(parse("(a)"), "a");
        assert_eq!(parse("(a,)"), "(a,)");
        assert_eq!(parse("(a, b,)"), "(a, b)");
        assert_eq!(parse("['x', 'y']"), r#"["x", "y"]"#);
        assert_eq!(parse("{'pt': j.pt(), 'eta': j.eta()}"), r#"{"pt": j.pt(), "eta": j.eta()}"#);
    }

    #[test]
    fn test_constants() {
        assert_eq!(parse_query("True").unwrap(), Expr::Constant(Constant::Bool(true)));
        assert_eq!(parse_query("None").unwrap(), Expr::Constant(Constant::None));
        assert_eq!(parse_query("'abc'").unwrap(), Expr::string("abc"));
    }

    #[test_case(r"'it\'s'", "it's" ; "escaped single quote")]
    #[test_case(r#""say \"hi\"""#, "say \"hi\"" ; "escaped double quote")]
    #[test_case(r"'a\\b'", "a\\b" ; "escaped backslash")]
    #[test_case(r"'tab\there'", "tab\there" ; "tab")]
    #[test_case(r"'\q'", "q" ; "unknown escape keeps character")]
    fn test_string_escapes(text: &str, expected: &str) {
        let parsed = parse_query(text).unwrap();
        assert_eq!(parsed, Expr::string(expected));
        assert_eq!(parse_query(&parsed.to_string()).unwrap(), parsed);
    }

    #[test]
    fn test_display_reparses() {
        let text = "Select(EventDataset(), e => {'n': e.Jets().Count(), 'ok': not e.x() > 2})";
        let once = parse(text);
        assert_eq!(parse(&once), once);
    }

    #[test]
    fn test_error_has_position() {
        let err = parse_query("Select(e => e.pt(),\n  )) ").unwrap_err();
        let ParseError::Syntax { message } = err;
        assert!(message.contains("Line 2"), "{}", message);
    }
}
