//! # sqlreward-core
//!
//! Scores a candidate SQL query against a reference query.
//!
//! This crate provides:
//! - A hand-written recursive descent parser with Pratt expression parsing
//! - Schema validation with alias resolution across every query scope
//! - Clause-level structural comparison and an exact, normalized comparison
//! - Result-set comparison through a pluggable [`Connection`]
//! - Gated score aggregation with configurable weights, caps and bounds
//!
//! ## Evaluating an answer
//!
//! ```rust
//! use sqlreward_core::{Candidate, Evaluator, EvaluatorConfig, QueryMetadata, Reference, Schema};
//! use sqlreward_core::metadata::{Complexity, Style};
//!
//! let schema = Schema::new().table("snippets", ["id", "complexity"]);
//! let metadata = QueryMetadata::new()
//!     .complexity(Complexity::Moderate)
//!     .style(Style::Vague);
//! let reference = Reference::new(
//!     "SELECT snippets.id FROM snippets WHERE snippets.complexity > 5",
//!     &metadata,
//! )
//! .schema(&schema);
//!
//! let evaluator = Evaluator::new(EvaluatorConfig::default());
//! let candidate = Candidate::sql("SELECT s.id FROM snippets s WHERE s.complexity > 5");
//! let evaluation = evaluator.evaluate(&candidate, &reference, None);
//!
//! assert!(evaluation.comparison.is_some_and(|c| c.matched));
//! assert_eq!(evaluation.final_score, 10.0);
//! ```
//!
//! ## Parsing and normalizing
//!
//! ```rust
//! use sqlreward_core::dialect::GenericDialect;
//! use sqlreward_core::normalize::normalize_sql;
//!
//! let sql = normalize_sql("select  A, b from T where a=1", &GenericDialect::new()).unwrap();
//! assert_eq!(sql, "SELECT a, b FROM t WHERE a = 1");
//! ```

pub mod ast;
pub mod compare;
pub mod dialect;
pub mod evaluator;
pub mod execution;
pub mod lexer;
pub mod metadata;
pub mod normalize;
pub mod parser;
pub mod schema;
pub mod scoring;
pub mod validate;

pub use ast::{Expr, Statement};
pub use compare::{select_strategy, ComparisonOutcome, Strategy};
pub use evaluator::{Candidate, Evaluation, Evaluator, EvaluatorConfig, Reference};
pub use execution::{Connection, ExecutionConfig, ExecutionError, Row, Value};
pub use lexer::{Lexer, Token, TokenKind};
pub use metadata::QueryMetadata;
pub use parser::{parse, BuildError, ParseError, ParsedSql, Parser, ParserConfig};
pub use schema::Schema;
pub use scoring::{ScoreBreakdown, ScoringConfig};
pub use validate::{validate, SchemaError, ValidationMode, ValidationResult};
