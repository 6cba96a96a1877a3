//! SQL Parser implementation.

use super::error::ParseError;
use super::pratt::{infix_binding_power, token_to_binary_op, token_to_unary_op, NEG_PREFIX_BP};
use crate::ast::{
    Cte, DeleteStatement, Expr, FunctionCall, InsertSource, InsertStatement, JoinClause,
    JoinType, Literal, NullOrdering, OrderBy, OrderDirection, Query, SelectColumn,
    SelectStatement, SetExpr, SetOperator, Statement, TableRef, TypeName, UpdateAssignment,
    UpdateStatement, With,
};
use crate::dialect::Dialect;
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Default limit on nested expressions and queries.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// SQL Parser.
///
/// The input is tokenized up front so that `NOT IN`, `NOT LIKE` and friends
/// can be recognized with one token of lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Parameter counter for ? placeholders.
    param_counter: usize,
    /// Current nesting of expressions and queries.
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &str, dialect: &dyn Dialect) -> Self {
        let tokens = Lexer::new(input, dialect).tokenize();
        Self {
            tokens,
            pos: 0,
            param_counter: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets how deeply expressions and queries may nest before parsing fails.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses exactly one SQL statement.
    ///
    /// Trailing semicolons are accepted; anything after them is an error.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the input is not a single valid statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let statement = match &self.current().kind {
            TokenKind::Keyword(Keyword::Select | Keyword::With) | TokenKind::LeftParen => {
                Statement::Query(Box::new(self.parse_query()?))
            }
            TokenKind::Keyword(Keyword::Insert) => {
                Statement::Insert(self.parse_insert_statement()?)
            }
            TokenKind::Keyword(Keyword::Update) => {
                Statement::Update(self.parse_update_statement()?)
            }
            TokenKind::Keyword(Keyword::Delete) => {
                Statement::Delete(self.parse_delete_statement()?)
            }
            _ => {
                return Err(self.unexpected("SELECT, WITH, INSERT, UPDATE, or DELETE"));
            }
        };

        while self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        if !self.current().is_eof() {
            return Err(self.unexpected("end of statement"));
        }

        Ok(statement)
    }

    // ====================================================================
    // Queries
    // ====================================================================

    /// Parses a query: optional WITH, a body and trailing ORDER BY/LIMIT.
    fn parse_query(&mut self) -> Result<Query, ParseError> {
        self.nested(Self::parse_query_inner)
    }

    fn parse_query_inner(&mut self) -> Result<Query, ParseError> {
        let with = if self.check_keyword(Keyword::With) {
            Some(self.parse_with()?)
        } else {
            None
        };

        let body = self.parse_set_expr()?;

        // ORDER BY clause
        let order_by = if self.check_keyword(Keyword::Order) {
            self.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()?
        } else {
            vec![]
        };

        // LIMIT clause, including the `LIMIT offset, count` form
        let (limit, mut offset) = if self.check_keyword(Keyword::Limit) {
            self.advance();
            let first = self.parse_expression(0)?;
            if self.check(&TokenKind::Comma) {
                self.advance();
                let count = self.parse_expression(0)?;
                (Some(count), Some(first))
            } else {
                (Some(first), None)
            }
        } else {
            (None, None)
        };

        // OFFSET clause
        if offset.is_none() && self.check_keyword(Keyword::Offset) {
            self.advance();
            offset = Some(self.parse_expression(0)?);
        }

        Ok(Query {
            with,
            body,
            order_by,
            limit,
            offset,
        })
    }

    /// Parses a WITH clause.
    fn parse_with(&mut self) -> Result<With, ParseError> {
        self.expect_keyword(Keyword::With)?;
        let recursive = if self.check_keyword(Keyword::Recursive) {
            self.advance();
            true
        } else {
            false
        };

        let mut ctes = vec![];
        loop {
            let name = self.expect_identifier()?;
            let columns = if self.check(&TokenKind::LeftParen) {
                self.advance();
                let columns = self.parse_identifier_list()?;
                self.expect(&TokenKind::RightParen)?;
                columns
            } else {
                vec![]
            };
            self.expect_keyword(Keyword::As)?;
            self.expect(&TokenKind::LeftParen)?;
            let query = self.parse_query()?;
            self.expect(&TokenKind::RightParen)?;
            ctes.push(Cte {
                name,
                columns,
                query: Box::new(query),
            });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(With { recursive, ctes })
    }

    /// Parses a chain of set operations, left-associative.
    fn parse_set_expr(&mut self) -> Result<SetExpr, ParseError> {
        let mut left = self.parse_set_operand()?;

        loop {
            let op = match &self.current().kind {
                TokenKind::Keyword(Keyword::Union) => SetOperator::Union,
                TokenKind::Keyword(Keyword::Intersect) => SetOperator::Intersect,
                TokenKind::Keyword(Keyword::Except) => SetOperator::Except,
                _ => break,
            };
            self.advance();

            let all = if self.check_keyword(Keyword::All) {
                self.advance();
                true
            } else {
                if self.check_keyword(Keyword::Distinct) {
                    self.advance();
                }
                false
            };

            let right = self.parse_set_operand()?;
            left = SetExpr::SetOperation {
                op,
                all,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses a SELECT block or a parenthesized query.
    fn parse_set_operand(&mut self) -> Result<SetExpr, ParseError> {
        if self.check(&TokenKind::LeftParen) {
            self.advance();
            let query = self.parse_query()?;
            self.expect(&TokenKind::RightParen)?;
            Ok(SetExpr::Query(Box::new(query)))
        } else if self.check_keyword(Keyword::Select) {
            Ok(SetExpr::Select(Box::new(self.parse_select_block()?)))
        } else {
            Err(self.unexpected("SELECT"))
        }
    }

    /// Parses a single SELECT block.
    fn parse_select_block(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect_keyword(Keyword::Select)?;

        // DISTINCT or ALL
        let distinct = if self.check_keyword(Keyword::Distinct) {
            self.advance();
            true
        } else if self.check_keyword(Keyword::All) {
            self.advance();
            false
        } else {
            false
        };

        // SELECT columns
        let columns = self.parse_select_columns()?;

        // FROM clause (optional for expressions like SELECT 1+1)
        let mut from = vec![];
        if self.check_keyword(Keyword::From) {
            self.advance();
            loop {
                from.push(self.parse_table_ref()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        // WHERE clause
        let where_clause = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        // GROUP BY clause
        let group_by = if self.check_keyword(Keyword::Group) {
            self.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_expression_list()?
        } else {
            vec![]
        };

        // HAVING clause
        let having = if self.check_keyword(Keyword::Having) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        Ok(SelectStatement {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
        })
    }

    /// Parses SELECT columns.
    fn parse_select_columns(&mut self) -> Result<Vec<SelectColumn>, ParseError> {
        let mut columns = vec![];

        loop {
            let expr = self.parse_expression(0)?;
            let alias = self.parse_optional_alias()?;
            columns.push(SelectColumn { expr, alias });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(columns)
    }

    // ====================================================================
    // FROM items
    // ====================================================================

    /// Parses a table reference with any trailing joins.
    fn parse_table_ref(&mut self) -> Result<TableRef, ParseError> {
        let mut table_ref = self.parse_table_factor()?;

        while self.is_join_keyword() {
            let join_type = self.parse_join_type()?;
            let right = self.parse_table_factor()?;

            let (on, using) = if join_type == JoinType::Cross {
                (None, vec![])
            } else if self.check_keyword(Keyword::On) {
                self.advance();
                (Some(self.parse_expression(0)?), vec![])
            } else if self.check_keyword(Keyword::Using) {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let cols = self.parse_identifier_list()?;
                self.expect(&TokenKind::RightParen)?;
                (None, cols)
            } else {
                return Err(ParseError::new(
                    "Expected ON or USING clause",
                    self.current().span,
                ));
            };

            table_ref = TableRef::Join {
                left: Box::new(table_ref),
                join: Box::new(JoinClause {
                    join_type,
                    table: right,
                    on,
                    using,
                }),
            };
        }

        Ok(table_ref)
    }

    /// Parses a named table, a derived table or a parenthesized join.
    fn parse_table_factor(&mut self) -> Result<TableRef, ParseError> {
        if self.check(&TokenKind::LeftParen) {
            self.advance();
            if self.check_keyword(Keyword::Select) || self.check_keyword(Keyword::With) {
                let query = self.parse_query()?;
                self.expect(&TokenKind::RightParen)?;
                let alias = self.parse_optional_alias()?;
                return Ok(TableRef::Subquery {
                    query: Box::new(query),
                    alias,
                });
            }
            let inner = self.nested(Self::parse_table_ref)?;
            self.expect(&TokenKind::RightParen)?;
            return Ok(inner);
        }

        let first = self.expect_identifier()?;
        let (schema, name) = if self.check(&TokenKind::Dot) {
            self.advance();
            let table_name = self.expect_identifier()?;
            (Some(first), table_name)
        } else {
            (None, first)
        };

        let alias = self.parse_optional_alias()?;

        Ok(TableRef::Table {
            schema,
            name,
            alias,
        })
    }

    /// Checks if current token is a join keyword.
    fn is_join_keyword(&self) -> bool {
        matches!(
            &self.current().kind,
            TokenKind::Keyword(
                Keyword::Join
                    | Keyword::Inner
                    | Keyword::Left
                    | Keyword::Right
                    | Keyword::Full
                    | Keyword::Cross
            )
        )
    }

    /// Parses a join type.
    fn parse_join_type(&mut self) -> Result<JoinType, ParseError> {
        let join_type = match &self.current().kind {
            TokenKind::Keyword(Keyword::Join) => {
                self.advance();
                return Ok(JoinType::Inner);
            }
            TokenKind::Keyword(Keyword::Inner) => JoinType::Inner,
            TokenKind::Keyword(Keyword::Left) => JoinType::Left,
            TokenKind::Keyword(Keyword::Right) => JoinType::Right,
            TokenKind::Keyword(Keyword::Full) => JoinType::Full,
            TokenKind::Keyword(Keyword::Cross) => JoinType::Cross,
            _ => return Err(self.unexpected("JOIN keyword")),
        };
        self.advance();
        if matches!(join_type, JoinType::Left | JoinType::Right | JoinType::Full)
            && self.check_keyword(Keyword::Outer)
        {
            self.advance();
        }
        self.expect_keyword(Keyword::Join)?;
        Ok(join_type)
    }

    /// Parses an optional alias (`AS name` or a bare name).
    ///
    /// Reserved words lex as keywords, so a bare identifier is always an
    /// alias here.
    fn parse_optional_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.check_keyword(Keyword::As) {
            self.advance();
            Ok(Some(self.expect_identifier()?))
        } else if matches!(
            &self.current().kind,
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_)
        ) {
            Ok(Some(self.expect_identifier()?))
        } else {
            Ok(None)
        }
    }

    // ====================================================================
    // Data manipulation
    // ====================================================================

    /// Parses an INSERT statement.
    fn parse_insert_statement(&mut self) -> Result<InsertStatement, ParseError> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;

        let table = self.expect_identifier()?;

        // Optional column list
        let columns = if self.check(&TokenKind::LeftParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect(&TokenKind::RightParen)?;
            cols
        } else {
            vec![]
        };

        let source = if self.check_keyword(Keyword::Values) {
            self.advance();
            let mut rows = vec![];
            loop {
                self.expect(&TokenKind::LeftParen)?;
                let values = self.parse_expression_list()?;
                self.expect(&TokenKind::RightParen)?;
                rows.push(values);

                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            InsertSource::Values(rows)
        } else if self.check_keyword(Keyword::Default) {
            self.advance();
            self.expect_keyword(Keyword::Values)?;
            InsertSource::DefaultValues
        } else if self.check_keyword(Keyword::Select) || self.check_keyword(Keyword::With) {
            InsertSource::Query(Box::new(self.parse_query()?))
        } else {
            return Err(self.unexpected("VALUES, SELECT, or DEFAULT VALUES"));
        };

        Ok(InsertStatement {
            table,
            columns,
            source,
        })
    }

    /// Parses an UPDATE statement.
    fn parse_update_statement(&mut self) -> Result<UpdateStatement, ParseError> {
        self.expect_keyword(Keyword::Update)?;

        let table = self.expect_identifier()?;
        let alias = self.parse_optional_alias()?;

        self.expect_keyword(Keyword::Set)?;

        let mut assignments = vec![];
        loop {
            let column = self.expect_identifier()?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expression(0)?;
            assignments.push(UpdateAssignment { column, value });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        let mut from = vec![];
        if self.check_keyword(Keyword::From) {
            self.advance();
            loop {
                from.push(self.parse_table_ref()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        let where_clause = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        Ok(UpdateStatement {
            table,
            alias,
            assignments,
            from,
            where_clause,
        })
    }

    /// Parses a DELETE statement.
    fn parse_delete_statement(&mut self) -> Result<DeleteStatement, ParseError> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;

        let table = self.expect_identifier()?;
        let alias = self.parse_optional_alias()?;

        let where_clause = if self.check_keyword(Keyword::Where) {
            self.advance();
            Some(self.parse_expression(0)?)
        } else {
            None
        };

        Ok(DeleteStatement {
            table,
            alias,
            where_clause,
        })
    }

    /// Parses ORDER BY list.
    fn parse_order_by_list(&mut self) -> Result<Vec<OrderBy>, ParseError> {
        let mut items = vec![];

        loop {
            let expr = self.parse_expression(0)?;
            let direction = if self.check_keyword(Keyword::Desc) {
                self.advance();
                OrderDirection::Desc
            } else {
                if self.check_keyword(Keyword::Asc) {
                    self.advance();
                }
                OrderDirection::Asc
            };

            let nulls = if self.check_keyword(Keyword::Nulls) {
                self.advance();
                if self.check_keyword(Keyword::First) {
                    self.advance();
                    Some(NullOrdering::First)
                } else {
                    self.expect_keyword(Keyword::Last)?;
                    Some(NullOrdering::Last)
                }
            } else {
                None
            };

            items.push(OrderBy {
                expr,
                direction,
                nulls,
            });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    // ====================================================================
    // Expressions
    // ====================================================================

    /// Parses an expression using Pratt parsing.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.nested(|this| this.parse_infix(min_bp))
    }

    fn parse_infix(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((l_bp, r_bp)) = infix_binding_power(&self.current().kind) else {
                break;
            };

            if l_bp < min_bp {
                break;
            }

            // `NOT` is only infix as part of NOT IN / NOT BETWEEN / NOT LIKE
            let negated = if self.check_keyword(Keyword::Not) {
                if !matches!(
                    self.peek().kind,
                    TokenKind::Keyword(Keyword::In | Keyword::Between | Keyword::Like)
                ) {
                    break;
                }
                self.advance();
                true
            } else {
                false
            };

            match &self.current().kind {
                TokenKind::Keyword(Keyword::Is) => {
                    self.advance();
                    let negated = if self.check_keyword(Keyword::Not) {
                        self.advance();
                        true
                    } else {
                        false
                    };
                    self.expect_keyword(Keyword::Null)?;
                    lhs = Expr::IsNull {
                        expr: Box::new(lhs),
                        negated,
                    };
                }
                TokenKind::Keyword(Keyword::In) => {
                    self.advance();
                    self.expect(&TokenKind::LeftParen)?;
                    lhs = if self.check_keyword(Keyword::Select) || self.check_keyword(Keyword::With)
                    {
                        let query = self.parse_query()?;
                        Expr::InSubquery {
                            expr: Box::new(lhs),
                            query: Box::new(query),
                            negated,
                        }
                    } else {
                        let list = self.parse_expression_list()?;
                        Expr::InList {
                            expr: Box::new(lhs),
                            list,
                            negated,
                        }
                    };
                    self.expect(&TokenKind::RightParen)?;
                }
                TokenKind::Keyword(Keyword::Between) => {
                    self.advance();
                    let low = self.parse_expression(r_bp)?;
                    self.expect_keyword(Keyword::And)?;
                    let high = self.parse_expression(r_bp)?;
                    lhs = Expr::Between {
                        expr: Box::new(lhs),
                        low: Box::new(low),
                        high: Box::new(high),
                        negated,
                    };
                }
                TokenKind::Keyword(Keyword::Like) => {
                    self.advance();
                    let pattern = self.parse_expression(r_bp)?;
                    lhs = Expr::Like {
                        expr: Box::new(lhs),
                        pattern: Box::new(pattern),
                        negated,
                    };
                }
                kind => {
                    let Some(op) = token_to_binary_op(kind) else {
                        break;
                    };
                    self.advance();
                    let rhs = self.parse_expression(r_bp)?;
                    lhs = lhs.binary(op, rhs);
                }
            }
        }

        Ok(lhs)
    }

    /// Parses a prefix expression.
    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        if self.check_keyword(Keyword::Not) && self.peek_keyword(Keyword::Exists) {
            self.advance();
            return self.parse_exists(true);
        }

        if let Some((op, bp)) = token_to_unary_op(&self.current().kind) {
            self.advance();
            let operand = self.parse_expression(bp)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        // Unary plus is a no-op.
        if self.check(&TokenKind::Plus) {
            self.advance();
            return self.parse_expression(NEG_PREFIX_BP);
        }

        self.parse_primary()
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        let is_bare = matches!(token.kind, TokenKind::Identifier(_));
        let span = token.span;

        match token.kind {
            // Literals
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(f)))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(value)))
            }
            TokenKind::Blob(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::Blob(value)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }

            // Parameter placeholders
            TokenKind::Question => {
                self.param_counter += 1;
                let position = self.param_counter;
                self.advance();
                Ok(Expr::Parameter { position })
            }

            // Wildcard
            TokenKind::Star => {
                self.advance();
                Ok(Expr::Wildcard { table: None })
            }

            // Parenthesized expression or scalar subquery
            TokenKind::LeftParen => {
                self.advance();
                if self.check_keyword(Keyword::Select) || self.check_keyword(Keyword::With) {
                    let subquery = self.parse_query()?;
                    self.expect(&TokenKind::RightParen)?;
                    Ok(Expr::Subquery(Box::new(subquery)))
                } else {
                    let expr = self.parse_expression(0)?;
                    self.expect(&TokenKind::RightParen)?;
                    Ok(Expr::Paren(Box::new(expr)))
                }
            }

            TokenKind::Keyword(Keyword::Case) => self.parse_case_expression(),
            TokenKind::Keyword(Keyword::Cast) => self.parse_cast_expression(),
            TokenKind::Keyword(Keyword::Exists) => self.parse_exists(false),

            // LEFT(...) and RIGHT(...) are string functions
            TokenKind::Keyword(kw @ (Keyword::Left | Keyword::Right))
                if matches!(self.peek().kind, TokenKind::LeftParen) =>
            {
                self.advance();
                self.parse_function_call(kw.as_str().to_string())
            }

            // Identifier (column reference or function call)
            TokenKind::Identifier(_)
            | TokenKind::QuotedIdentifier(_)
            | TokenKind::Keyword(Keyword::First | Keyword::Last | Keyword::Nulls) => {
                let name = self.expect_identifier()?;

                if is_bare && self.check(&TokenKind::LeftParen) {
                    return self.parse_function_call(name);
                }

                // Qualified name (table.column, table.*, or schema.table.column)
                if self.check(&TokenKind::Dot) {
                    self.advance();
                    if self.check(&TokenKind::Star) {
                        self.advance();
                        return Ok(Expr::Wildcard { table: Some(name) });
                    }
                    let mut table = name;
                    let mut column = self.expect_identifier()?;
                    if self.check(&TokenKind::Dot) {
                        self.advance();
                        table = column;
                        column = self.expect_identifier()?;
                    }
                    return Ok(Expr::Column {
                        table: Some(table),
                        name: column,
                        span: Span::new(span.start, self.previous_span().end),
                    });
                }

                Ok(Expr::Column {
                    table: None,
                    name,
                    span,
                })
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parses `EXISTS (query)`; a leading NOT has already been consumed.
    fn parse_exists(&mut self, negated: bool) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Exists)?;
        self.expect(&TokenKind::LeftParen)?;
        let query = self.parse_query()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::Exists {
            query: Box::new(query),
            negated,
        })
    }

    /// Parses a function call.
    fn parse_function_call(&mut self, name: String) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LeftParen)?;

        let distinct = if self.check_keyword(Keyword::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        let args = if self.check(&TokenKind::RightParen) {
            vec![]
        } else if self.check(&TokenKind::Star) && matches!(self.peek().kind, TokenKind::RightParen)
        {
            self.advance();
            vec![Expr::Wildcard { table: None }]
        } else {
            self.parse_expression_list()?
        };

        self.expect(&TokenKind::RightParen)?;

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            distinct,
        }))
    }

    /// Parses a CAST expression.
    fn parse_cast_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Cast)?;
        self.expect(&TokenKind::LeftParen)?;
        let expr = self.parse_expression(0)?;
        self.expect_keyword(Keyword::As)?;
        let data_type = self.parse_type_name()?;
        self.expect(&TokenKind::RightParen)?;

        Ok(Expr::Cast {
            expr: Box::new(expr),
            data_type,
        })
    }

    /// Parses a CASE expression.
    fn parse_case_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Case)?;

        // Simple CASE (CASE expr WHEN ...)
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };

        let mut when_clauses = vec![];
        while self.check_keyword(Keyword::When) {
            self.advance();
            let condition = self.parse_expression(0)?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expression(0)?;
            when_clauses.push((condition, result));
        }

        if when_clauses.is_empty() {
            return Err(self.unexpected("WHEN"));
        }

        let else_clause = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.parse_expression(0)?))
        } else {
            None
        };

        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parses a type name: one or more words with optional numeric params.
    fn parse_type_name(&mut self) -> Result<TypeName, ParseError> {
        let mut words = vec![self.expect_identifier()?];
        while matches!(self.current().kind, TokenKind::Identifier(_)) {
            words.push(self.expect_identifier()?);
        }

        let mut type_name = TypeName::new(words.join(" "));
        if self.check(&TokenKind::LeftParen) {
            self.advance();
            loop {
                let negative = if self.check(&TokenKind::Minus) {
                    self.advance();
                    true
                } else {
                    false
                };
                match &self.current().kind {
                    TokenKind::Integer(n) => {
                        let n = *n;
                        self.advance();
                        type_name.params.push(if negative { -n } else { n });
                    }
                    _ => return Err(self.unexpected("type parameter")),
                }
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect(&TokenKind::RightParen)?;
        }

        Ok(type_name)
    }

    /// Parses a comma-separated list of expressions.
    fn parse_expression_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expression(0)?];

        while self.check(&TokenKind::Comma) {
            self.advance();
            exprs.push(self.parse_expression(0)?);
        }

        Ok(exprs)
    }

    /// Parses a comma-separated list of identifiers.
    fn parse_identifier_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut idents = vec![self.expect_identifier()?];

        while self.check(&TokenKind::Comma) {
            self.advance();
            idents.push(self.expect_identifier()?);
        }

        Ok(idents)
    }

    // --- Helper methods ---

    /// Runs `f` one nesting level deeper, failing past `max_depth`.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= self.max_depth {
            return Err(ParseError::new(
                format!("Nesting exceeds the maximum depth of {}", self.max_depth),
                self.current().span,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Returns the current token.
    fn current(&self) -> &Token {
        // The token stream always ends with EOF and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Returns the token after the current one.
    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    /// Returns the span of the most recently consumed token.
    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(Span::default, |token| token.span)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if !self.current().is_eof() {
            self.pos += 1;
        }
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current().kind) == core::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Checks if the next token is the given keyword.
    fn peek_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Builds an "unexpected token" error at the current token.
    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::unexpected(expected, token.kind.clone(), token.span)
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("{kind:?}")))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    /// Expects and returns an identifier.
    ///
    /// `NULLS`, `FIRST` and `LAST` only have meaning after ORDER BY and are
    /// accepted as plain names elsewhere.
    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let name = match &self.current().kind {
            TokenKind::Identifier(name) | TokenKind::QuotedIdentifier(name) => name.clone(),
            TokenKind::Keyword(kw @ (Keyword::First | Keyword::Last | Keyword::Nulls)) => {
                kw.as_str().to_ascii_lowercase()
            }
            _ => return Err(self.unexpected("identifier")),
        };
        self.advance();
        Ok(name)
    }
}
