//! Lookahead Engine Tests
//!
//! Decision compilation through the public analysis API: strategy
//! selection, dispatch correctness, k-bounded disambiguation, and the
//! enter-or-skip decisions for optional constructs.

use rstest::rstest;

use glimpse::analysis::{AnalysisConfig, analyze};
use glimpse::grammar::lookahead::{AltDecision, OptDecision};
use glimpse::grammar::model::{
    Alternation, Grammar, Optional, ProdKind, Production, Rule, Sequence, Terminal,
};
use glimpse::tokens::{TokenTypeId, TokenVocabulary};

struct Tokens {
    x: TokenTypeId,
    y: TokenTypeId,
    a: TokenTypeId,
    b: TokenTypeId,
    other: TokenTypeId,
    vocab: TokenVocabulary,
}

fn tokens() -> Tokens {
    let mut builder = TokenVocabulary::builder();
    let x = builder.token("X");
    let y = builder.token("Y");
    let a = builder.token("A");
    let b = builder.token("B");
    let other = builder.token("Other");
    Tokens {
        x,
        y,
        a,
        b,
        other,
        vocab: builder.build().unwrap(),
    }
}

fn term(t: TokenTypeId) -> Production {
    Production::Terminal(Terminal::new(t))
}

fn term_at(t: TokenTypeId, idx: u8) -> Production {
    Production::Terminal(Terminal::new(t).with_idx(idx))
}

// ============================================================================
// Alternation decisions
// ============================================================================

/// `a -> X | Y`: distinct first tokens compile to the O(1) table form.
#[test]
fn test_distinct_first_tokens_use_single_token_table() {
    let toks = tokens();
    let mut grammar = Grammar::new();
    let rule = grammar
        .add_rule(Rule::new(
            "a",
            vec![Production::Alternation(Alternation::new(vec![
                Sequence::new(vec![term(toks.x)]),
                Sequence::new(vec![term(toks.y)]),
            ]))],
        ))
        .unwrap();

    let analysis = analyze(grammar, toks.vocab, AnalysisConfig::default()).unwrap();
    let decision = analysis.alternation_decision(rule, 0, false);
    assert!(matches!(*decision, AltDecision::SingleTokenTable { .. }));
}

#[rstest]
#[case::first_alternative(0, Some(0))]
#[case::second_alternative(1, Some(1))]
#[case::unknown_token(4, None)]
fn test_single_token_dispatch(#[case] next: u32, #[case] expected: Option<usize>) {
    let toks = tokens();
    let next = match next {
        0 => toks.x,
        1 => toks.y,
        _ => toks.other,
    };
    let mut grammar = Grammar::new();
    let rule = grammar
        .add_rule(Rule::new(
            "a",
            vec![Production::Alternation(Alternation::new(vec![
                Sequence::new(vec![term(toks.x)]),
                Sequence::new(vec![term(toks.y)]),
            ]))],
        ))
        .unwrap();

    let analysis = analyze(grammar, toks.vocab, AnalysisConfig::default()).unwrap();
    let decision = analysis.alternation_decision(rule, 0, false);
    let mut la = |_n: usize| next;
    assert_eq!(decision.choose(analysis.vocab(), &mut la, None), expected);
}

/// `[X, A]` vs `[X, B]` at k = 2: both alternatives extend to length 2
/// and the compiled decision peeks exactly two tokens.
#[test]
fn test_k_bounded_disambiguation_consults_two_tokens() {
    let toks = tokens();
    let mut grammar = Grammar::new();
    let rule = grammar
        .add_rule(Rule::new(
            "r",
            vec![Production::Alternation(Alternation::new(vec![
                Sequence::new(vec![term(toks.x), term(toks.a)]),
                Sequence::new(vec![term_at(toks.x, 1), term(toks.b)]),
            ]))],
        ))
        .unwrap();

    let config = AnalysisConfig {
        max_lookahead: 2,
        ..AnalysisConfig::default()
    };
    let analysis = analyze(grammar, toks.vocab, config).unwrap();
    let decision = analysis.alternation_decision(rule, 0, false);

    let input = [toks.x, toks.b];
    let mut consulted = 0usize;
    let mut la = |n: usize| {
        consulted = consulted.max(n);
        input[n - 1]
    };
    assert_eq!(decision.choose(analysis.vocab(), &mut la, None), Some(1));
    assert_eq!(consulted, 2, "decision must peek exactly two tokens");
}

/// The same grammar with k = 1 cannot be disambiguated and validation
/// reports the ambiguity instead of silently compiling a wrong decision.
#[test]
fn test_k_smaller_than_divergence_reports_ambiguity() {
    let toks = tokens();
    let mut grammar = Grammar::new();
    grammar
        .add_rule(Rule::new(
            "r",
            vec![Production::Alternation(Alternation::new(vec![
                Sequence::new(vec![term(toks.x), term(toks.a)]),
                Sequence::new(vec![term_at(toks.x, 1), term(toks.b)]),
            ]))],
        ))
        .unwrap();

    let config = AnalysisConfig {
        max_lookahead: 1,
        ..AnalysisConfig::default()
    };
    let err = analyze(grammar, toks.vocab, config).unwrap_err();
    assert!(
        err.diagnostics
            .iter()
            .any(|d| d.code() == glimpse::DiagnosticCode::AmbiguousAlternatives)
    );
}

// ============================================================================
// Optional-construct decisions
// ============================================================================

/// `b -> (X)? Y`: entering is decided against the rest of the rule, so
/// only X enters and Y skips.
#[rstest]
#[case::enters_on_x(true)]
#[case::skips_on_y(false)]
fn test_option_decision_uses_rest_of_rule(#[case] enter: bool) {
    let toks = tokens();
    let mut grammar = Grammar::new();
    let rule = grammar
        .add_rule(Rule::new(
            "b",
            vec![
                Production::Optional(Optional::new(vec![term(toks.x)])),
                term(toks.y),
            ],
        ))
        .unwrap();

    let analysis = analyze(grammar, toks.vocab, AnalysisConfig::default()).unwrap();
    let decision = analysis.optional_decision(rule, ProdKind::Optional, 0);
    assert!(matches!(*decision, OptDecision::SingleToken { .. }));

    let next = if enter { toks.x } else { toks.y };
    let mut la = |_n: usize| next;
    assert_eq!(decision.should_enter(analysis.vocab(), &mut la), enter);
}

// ============================================================================
// Category-aware matching
// ============================================================================

#[test]
fn test_category_member_satisfies_category_path() {
    let mut builder = TokenVocabulary::builder();
    let keyword = builder.token("Keyword");
    let if_kw = builder.token_in("If", &[keyword]);
    let ident = builder.token("Ident");
    let vocab = builder.build().unwrap();

    let mut grammar = Grammar::new();
    let rule = grammar
        .add_rule(Rule::new(
            "s",
            vec![Production::Alternation(Alternation::new(vec![
                Sequence::new(vec![term(keyword)]),
                Sequence::new(vec![term(ident)]),
            ]))],
        ))
        .unwrap();

    let analysis = analyze(grammar, vocab, AnalysisConfig::default()).unwrap();
    let decision = analysis.alternation_decision(rule, 0, false);

    let mut la = |_n: usize| if_kw;
    assert_eq!(decision.choose(analysis.vocab(), &mut la, None), Some(0));
}
