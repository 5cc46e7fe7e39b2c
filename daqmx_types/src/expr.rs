/* Size and adaptor expressions.
 *
 * `custom-code` size specifications carry a C-like integer expression over peer
 * parameter names, e.g. `(reversePolyOrder < 0) ? numForwardCoeffsIn : reversePolyOrder + 1`.
 * Expressions are parsed once into an `ExprKind` tree; the tree is evaluated by the
 * runtime and rendered to Rust source by the emitter. */

use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Maximum nesting depth accepted by the parsers.
pub const MAX_EXPR_DEPTH: usize = 64;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }

    fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExprKind {
    Literal(i64),
    ParamRef(String),
    Unary {
        op: UnaryOp,
        operand: Box<ExprKind>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExprKind>,
        right: Box<ExprKind>,
    },
    Ternary {
        condition: Box<ExprKind>,
        then_branch: Box<ExprKind>,
        else_branch: Box<ExprKind>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unexpected token '{found}' (expected {expected})")]
    UnexpectedToken { found: String, expected: &'static str },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("integer literal '{0}' is out of range")]
    LiteralOutOfRange(String),

    #[error("expression nests deeper than {MAX_EXPR_DEPTH} levels")]
    TooDeep,

    #[error("undefined identifier '{0}'")]
    UndefinedIdentifier(String),

    #[error("arithmetic overflow evaluating '{0}'")]
    Overflow(String),

    #[error("division by zero evaluating '{0}'")]
    DivisionByZero(String),
}

/* Name lookup for evaluation; implemented for closures and maps */
pub trait Environment {
    fn lookup(&self, name: &str) -> Option<i64>;
}

impl<F> Environment for F
where
    F: Fn(&str) -> Option<i64>,
{
    fn lookup(&self, name: &str) -> Option<i64> {
        self(name)
    }
}

impl Environment for std::collections::BTreeMap<String, i64> {
    fn lookup(&self, name: &str) -> Option<i64> {
        self.get(name).copied()
    }
}

impl ExprKind {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = TokenParser { tokens, pos: 0, depth: 0 };
        let expr = parser.parse_ternary()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::UnexpectedToken { found: tok.to_string(), expected: "end of expression" }),
        }
    }

    /// Identifiers referenced anywhere in the expression, sorted.
    pub fn referenced_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut BTreeSet<String>) {
        match self {
            ExprKind::Literal(_) => {}
            ExprKind::ParamRef(name) => {
                names.insert(name.clone());
            }
            ExprKind::Unary { operand, .. } => operand.collect_names(names),
            ExprKind::Binary { left, right, .. } => {
                left.collect_names(names);
                right.collect_names(names);
            }
            ExprKind::Ternary { condition, then_branch, else_branch } => {
                condition.collect_names(names);
                then_branch.collect_names(names);
                else_branch.collect_names(names);
            }
        }
    }

    /// Evaluate with checked 64-bit arithmetic. Comparisons and logical operators
    /// yield 0 or 1; any non-zero value is true.
    pub fn evaluate(&self, env: &dyn Environment) -> Result<i64, ExprError> {
        match self {
            ExprKind::Literal(value) => Ok(*value),
            ExprKind::ParamRef(name) => env.lookup(name).ok_or_else(|| ExprError::UndefinedIdentifier(name.clone())),
            ExprKind::Unary { op, operand } => {
                let value = operand.evaluate(env)?;
                match op {
                    UnaryOp::Neg => value.checked_neg().ok_or_else(|| ExprError::Overflow(self.to_c_string())),
                    UnaryOp::Not => Ok((value == 0) as i64),
                }
            }
            ExprKind::Binary { op, left, right } => {
                let lhs = left.evaluate(env)?;
                /* short-circuit like C */
                match op {
                    BinaryOp::And if lhs == 0 => return Ok(0),
                    BinaryOp::Or if lhs != 0 => return Ok(1),
                    _ => {}
                }
                let rhs = right.evaluate(env)?;
                let overflow = || ExprError::Overflow(self.to_c_string());
                match op {
                    BinaryOp::Add => lhs.checked_add(rhs).ok_or_else(overflow),
                    BinaryOp::Sub => lhs.checked_sub(rhs).ok_or_else(overflow),
                    BinaryOp::Mul => lhs.checked_mul(rhs).ok_or_else(overflow),
                    BinaryOp::Div | BinaryOp::Mod if rhs == 0 => Err(ExprError::DivisionByZero(self.to_c_string())),
                    BinaryOp::Div => lhs.checked_div(rhs).ok_or_else(overflow),
                    BinaryOp::Mod => lhs.checked_rem(rhs).ok_or_else(overflow),
                    BinaryOp::Lt => Ok((lhs < rhs) as i64),
                    BinaryOp::Gt => Ok((lhs > rhs) as i64),
                    BinaryOp::Le => Ok((lhs <= rhs) as i64),
                    BinaryOp::Ge => Ok((lhs >= rhs) as i64),
                    BinaryOp::Eq => Ok((lhs == rhs) as i64),
                    BinaryOp::Ne => Ok((lhs != rhs) as i64),
                    BinaryOp::And | BinaryOp::Or => Ok((rhs != 0) as i64),
                }
            }
            ExprKind::Ternary { condition, then_branch, else_branch } => {
                if condition.evaluate(env)? != 0 {
                    then_branch.evaluate(env)
                } else {
                    else_branch.evaluate(env)
                }
            }
        }
    }

    /// Fully parenthesized C spelling; re-parses to an equal tree.
    pub fn to_c_string(&self) -> String {
        match self {
            ExprKind::Literal(value) => value.to_string(),
            ExprKind::ParamRef(name) => name.clone(),
            ExprKind::Unary { op: UnaryOp::Neg, operand } => format!("-({})", operand.to_c_string()),
            ExprKind::Unary { op: UnaryOp::Not, operand } => format!("!({})", operand.to_c_string()),
            ExprKind::Binary { op, left, right } => {
                format!("({}{}{})", left.to_c_string(), op.symbol(), right.to_c_string())
            }
            ExprKind::Ternary { condition, then_branch, else_branch } => format!(
                "({}?{}:{})",
                condition.to_c_string(),
                then_branch.to_c_string(),
                else_branch.to_c_string()
            ),
        }
    }

    /// Rust spelling over `i64` values. `rename` maps parameter names to the local
    /// variables that hold them in the emitted wrapper. The result carries no
    /// enclosing parentheses of its own.
    pub fn to_rust_string(&self, rename: &dyn Fn(&str) -> String) -> String {
        strip_outer_parens(self.rust_term(rename))
    }

    /* Parenthesized so it nests under any operator */
    fn rust_term(&self, rename: &dyn Fn(&str) -> String) -> String {
        match self {
            ExprKind::Literal(value) => format!("{}i64", value),
            ExprKind::ParamRef(name) => format!("({} as i64)", rename(name)),
            ExprKind::Unary { op: UnaryOp::Neg, operand } => format!("(-{})", operand.rust_term(rename)),
            ExprKind::Unary { op: UnaryOp::Not, operand } => {
                format!("(({} == 0) as i64)", operand.rust_term(rename))
            }
            ExprKind::Binary { op, left, right } => {
                let lhs = left.rust_term(rename);
                let rhs = right.rust_term(rename);
                match op {
                    BinaryOp::And => format!("((({} != 0) && ({} != 0)) as i64)", lhs, rhs),
                    BinaryOp::Or => format!("((({} != 0) || ({} != 0)) as i64)", lhs, rhs),
                    op if op.is_comparison() => format!("(({} {} {}) as i64)", lhs, op.symbol(), rhs),
                    op => format!("({} {} {})", lhs, op.symbol(), rhs),
                }
            }
            /* branches are block tails, so they go bare */
            ExprKind::Ternary { condition, then_branch, else_branch } => format!(
                "(if {} != 0 {{ {} }} else {{ {} }})",
                condition.rust_term(rename),
                then_branch.to_rust_string(rename),
                else_branch.to_rust_string(rename)
            ),
        }
    }
}

/* Drop one pair of parentheses when it encloses the whole text */
fn strip_outer_parens(text: String) -> String {
    if !(text.starts_with('(') && text.ends_with(')')) {
        return text;
    }
    let last = text.len() - 1;
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && idx != last {
                    return text;
                }
            }
            _ => {}
        }
    }
    text[1..last].to_string()
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_c_string())
    }
}

/* Adaptor construction expressions: `AIChannel(task, coalesce(nameToAssignToChannel, physicalChannel))` */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AdaptorExpr {
    Param(String),
    Str(String),
    Call { callee: String, args: Vec<AdaptorExpr> },
}

impl AdaptorExpr {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = TokenParser { tokens, pos: 0, depth: 0 };
        let expr = parser.parse_adaptor()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::UnexpectedToken { found: tok.to_string(), expected: "end of expression" }),
        }
    }

    /// Parameter names referenced by the expression (callee names excluded).
    pub fn referenced_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                AdaptorExpr::Param(name) => {
                    names.insert(name.clone());
                }
                AdaptorExpr::Str(_) => {}
                AdaptorExpr::Call { args, .. } => stack.extend(args.iter()),
            }
        }
        names
    }
}

impl fmt::Display for AdaptorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptorExpr::Param(name) => f.write_str(name),
            AdaptorExpr::Str(value) => write!(f, "{:?}", value),
            AdaptorExpr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(String),
    Ident(String),
    Str(String),
    Op(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(text) | Token::Ident(text) => f.write_str(text),
            Token::Str(text) => write!(f, "{:?}", text),
            Token::Op(op) => f.write_str(op),
        }
    }
}

const OPERATORS: &[&str] = &[
    "<=", ">=", "==", "!=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "?", ":", "(", ")", ",",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut offset = 0;

    while offset < bytes.len() {
        let ch = bytes[offset] as char;
        if ch.is_ascii_whitespace() {
            offset += 1;
            continue;
        }
        if ch.is_ascii_digit() {
            let start = offset;
            while offset < bytes.len() && (bytes[offset] as char).is_ascii_digit() {
                offset += 1;
            }
            /* C unsigned suffix, e.g. `0U` */
            if offset < bytes.len() && matches!(bytes[offset], b'u' | b'U') {
                offset += 1;
                tokens.push(Token::Int(source[start..offset - 1].to_string()));
            } else {
                tokens.push(Token::Int(source[start..offset].to_string()));
            }
            continue;
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = offset;
            while offset < bytes.len() && ((bytes[offset] as char).is_ascii_alphanumeric() || bytes[offset] == b'_') {
                offset += 1;
            }
            tokens.push(Token::Ident(source[start..offset].to_string()));
            continue;
        }
        if ch == '"' {
            let start = offset + 1;
            let end = source[start..]
                .find('"')
                .map(|idx| start + idx)
                .ok_or(ExprError::UnexpectedEnd)?;
            tokens.push(Token::Str(source[start..end].to_string()));
            offset = end + 1;
            continue;
        }
        match OPERATORS.iter().find(|op| source[offset..].starts_with(**op)) {
            Some(op) => {
                tokens.push(Token::Op(op));
                offset += op.len();
            }
            None => {
                let ch = source[offset..].chars().next().unwrap_or(ch);
                return Err(ExprError::UnexpectedChar { ch, offset });
            }
        }
    }

    Ok(tokens)
}

struct TokenParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl TokenParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat_op(&mut self, op: &'static str) -> bool {
        if self.peek() == Some(&Token::Op(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &'static str) -> Result<(), ExprError> {
        match self.next() {
            Some(Token::Op(found)) if found == op => Ok(()),
            Some(other) => Err(ExprError::UnexpectedToken { found: other.to_string(), expected: op }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }

    fn parse_ternary(&mut self) -> Result<ExprKind, ExprError> {
        self.enter()?;
        let condition = self.parse_binary(0)?;
        let expr = if self.eat_op("?") {
            let then_branch = self.parse_ternary()?;
            self.expect_op(":")?;
            let else_branch = self.parse_ternary()?;
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }
        } else {
            condition
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let op = match self.peek()? {
            Token::Op("+") => BinaryOp::Add,
            Token::Op("-") => BinaryOp::Sub,
            Token::Op("*") => BinaryOp::Mul,
            Token::Op("/") => BinaryOp::Div,
            Token::Op("%") => BinaryOp::Mod,
            Token::Op("<") => BinaryOp::Lt,
            Token::Op(">") => BinaryOp::Gt,
            Token::Op("<=") => BinaryOp::Le,
            Token::Op(">=") => BinaryOp::Ge,
            Token::Op("==") => BinaryOp::Eq,
            Token::Op("!=") => BinaryOp::Ne,
            Token::Op("&&") => BinaryOp::And,
            Token::Op("||") => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /* precedence climbing, all binary operators left-associative */
    fn parse_binary(&mut self, min_prec: u8) -> Result<ExprKind, ExprError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_binary_op() {
            if op.precedence() <= min_prec {
                break;
            }
            self.pos += 1;
            self.enter()?;
            let right = self.parse_binary(op.precedence())?;
            self.depth -= 1;
            left = ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprKind, ExprError> {
        if self.eat_op("-") {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            /* fold negative literals so `-1` round-trips as a literal */
            return Ok(match operand {
                ExprKind::Literal(value) => ExprKind::Literal(-value),
                other => ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(other) },
            });
        }
        if self.eat_op("!") {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ExprKind, ExprError> {
        match self.next() {
            Some(Token::Int(text)) => text
                .parse::<i64>()
                .map(ExprKind::Literal)
                .map_err(|_| ExprError::LiteralOutOfRange(text)),
            Some(Token::Ident(name)) => Ok(ExprKind::ParamRef(name)),
            Some(Token::Op("(")) => {
                let inner = self.parse_ternary()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Some(other) => Err(ExprError::UnexpectedToken { found: other.to_string(), expected: "operand" }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn parse_adaptor(&mut self) -> Result<AdaptorExpr, ExprError> {
        self.enter()?;
        let expr = match self.next() {
            Some(Token::Str(value)) => AdaptorExpr::Str(value),
            Some(Token::Ident(name)) => {
                if self.eat_op("(") {
                    let mut args = Vec::new();
                    if !self.eat_op(")") {
                        loop {
                            args.push(self.parse_adaptor()?);
                            if self.eat_op(")") {
                                break;
                            }
                            self.expect_op(",")?;
                        }
                    }
                    AdaptorExpr::Call { callee: name, args }
                } else {
                    AdaptorExpr::Param(name)
                }
            }
            Some(other) => {
                return Err(ExprError::UnexpectedToken { found: other.to_string(), expected: "identifier or string" })
            }
            None => return Err(ExprError::UnexpectedEnd),
        };
        self.depth -= 1;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn reverse_poly_expression_selects_forward_count_for_negative_order() {
        let expr = ExprKind::parse("(reversePolyOrder < 0) ? numForwardCoeffsIn : reversePolyOrder + 1").unwrap();
        let names: Vec<_> = expr.referenced_names().into_iter().collect();
        assert_eq!(names, vec!["numForwardCoeffsIn", "reversePolyOrder"]);

        assert_eq!(expr.evaluate(&env(&[("reversePolyOrder", -1), ("numForwardCoeffsIn", 4)])).unwrap(), 4);
        assert_eq!(expr.evaluate(&env(&[("reversePolyOrder", 2), ("numForwardCoeffsIn", 4)])).unwrap(), 3);
    }

    #[test]
    fn precedence_follows_c() {
        let expr = ExprKind::parse("1 + 2 * 3 - 4 / 2").unwrap();
        assert_eq!(expr.evaluate(&env(&[])).unwrap(), 5);
        let expr = ExprKind::parse("a < b && b < c || 0").unwrap();
        assert_eq!(expr.evaluate(&env(&[("a", 1), ("b", 2), ("c", 3)])).unwrap(), 1);
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let expr = ExprKind::parse("missing + 1").unwrap();
        assert_eq!(
            expr.evaluate(&env(&[])),
            Err(ExprError::UndefinedIdentifier("missing".to_string()))
        );
    }

    #[test]
    fn division_by_zero_and_overflow_are_errors() {
        let expr = ExprKind::parse("n / 0").unwrap();
        assert!(matches!(expr.evaluate(&env(&[("n", 3)])), Err(ExprError::DivisionByZero(_))));
        let expr = ExprKind::parse("n * n").unwrap();
        assert!(matches!(expr.evaluate(&env(&[("n", i64::MAX)])), Err(ExprError::Overflow(_))));
    }

    #[test]
    fn c_rendering_reparses_to_the_same_tree() {
        let source = "(reversePolyOrder < 0) ? numForwardCoeffsIn : reversePolyOrder + 1";
        let expr = ExprKind::parse(source).unwrap();
        assert_eq!(ExprKind::parse(&expr.to_c_string()).unwrap(), expr);
    }

    #[test]
    fn rust_rendering_has_no_enclosing_parens() {
        let same = |name: &str| name.to_string();
        let expr = ExprKind::parse("(reversePolyOrder < 0) ? numForwardCoeffsIn : reversePolyOrder + 1").unwrap();
        assert_eq!(
            expr.to_rust_string(&same),
            "if (((reversePolyOrder as i64) < 0i64) as i64) != 0 { numForwardCoeffsIn as i64 } else { (reversePolyOrder as i64) + 1i64 }"
        );
        /* leading and trailing parens that belong to different operands stay */
        let expr = ExprKind::parse("a * b").unwrap();
        assert_eq!(expr.to_rust_string(&same), "(a as i64) * (b as i64)");
        assert_eq!(ExprKind::parse("7").unwrap().to_rust_string(&same), "7i64");
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(ExprKind::parse(&deep), Err(ExprError::TooDeep));
    }

    #[test]
    fn rejects_trailing_garbage_and_bad_characters() {
        assert!(ExprKind::parse("a b").is_err());
        assert!(matches!(ExprKind::parse("a $ b"), Err(ExprError::UnexpectedChar { ch: '$', .. })));
    }

    #[test]
    fn parses_adaptor_calls() {
        let expr = AdaptorExpr::parse("AIChannel(task, coalesce(nameToAssignToChannel, physicalChannel))").unwrap();
        let names: Vec<_> = expr.referenced_names().into_iter().collect();
        assert_eq!(names, vec!["nameToAssignToChannel", "physicalChannel", "task"]);
        assert_eq!(expr.to_string(), "AIChannel(task, coalesce(nameToAssignToChannel, physicalChannel))");
    }
}
