pub(crate) mod grammar;

use crate::ast::QueryDocument;
use crate::diagnostics::{Budget, Error, ErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::text::{QueryText, SourceSpan, SourceText};

/// Parse Lucene-style query strings into a typed document.
///
/// The parser is fault-tolerant: it always produces a document, recovering
/// from malformed input and collecting diagnostics instead of failing.
///
/// ```rust
/// use lucene_parser::Parser;
///
/// let result = Parser::new("title:hello AND (status:active OR status:pending)").parse();
/// assert!(result.is_success());
/// let document = &result.document;
/// ```
#[derive(Debug)]
pub struct Parser<'input> {
    lexer: Lexer<'input>,
    source: SourceText,
    /// One lookahead token so we don't re-lex.
    current_token: Option<Token<'input>>,
    /// Syntax errors accumulated so far.
    errors: Vec<Error>,
    recursion: Budget,
    /// Set to false once a limit error is recorded, so the early termination
    /// does not masquerade as a pile of syntax errors.
    accept_errors: bool,
}

/// Deep enough for any hand-written query; bounded so recursive descent
/// cannot overflow the stack on adversarial input.
const DEFAULT_RECURSION_LIMIT: usize = 500;

impl<'input> Parser<'input> {
    /// Create a new instance of a parser given an input string.
    pub fn new(input: &'input str) -> Self {
        Self {
            lexer: Lexer::new(input),
            source: SourceText::new(input),
            current_token: None,
            errors: Vec::new(),
            recursion: Budget::limited(DEFAULT_RECURSION_LIMIT),
            accept_errors: true,
        }
    }

    /// Configure the recursion limit to use while parsing.
    pub fn recursion_limit(mut self, recursion_limit: usize) -> Self {
        self.recursion = Budget::limited(recursion_limit);
        self
    }

    /// Configure the limit on the number of tokens to parse. If an input is
    /// too big, parsing is aborted. By default there is no limit.
    pub fn token_limit(mut self, token_limit: usize) -> Self {
        self.lexer = self.lexer.clone().with_limit(token_limit);
        self
    }

    /// Parse the input.
    pub fn parse(mut self) -> ParseResult {
        let document = grammar::document::document(&mut self);
        ParseResult {
            document,
            errors: self.errors,
            recursion: self.recursion,
            tokens: self.lexer.budget(),
        }
    }

    /// Pull the next significant token from the lexer. Whitespace is skipped;
    /// lexical errors are recorded and their tokens dropped, which turns an
    /// invalid token between two primaries into an implicit conjunction.
    fn next_token(&mut self) -> Option<Token<'input>> {
        loop {
            match self.lexer.next()? {
                Err(err) => {
                    let hit_limit = err.kind() == ErrorKind::Limit;
                    if self.accept_errors {
                        self.errors.push(err);
                    }
                    if hit_limit {
                        self.accept_errors = false;
                    }
                }
                Ok(token) if token.kind() == TokenKind::Whitespace => {}
                Ok(token) => return Some(token),
            }
        }
    }

    /// Peek the next significant token.
    pub(crate) fn peek_token(&mut self) -> Option<&Token<'input>> {
        if self.current_token.is_none() {
            self.current_token = self.next_token();
        }
        self.current_token.as_ref()
    }

    /// Peek the next significant token's kind.
    pub(crate) fn peek(&mut self) -> Option<TokenKind> {
        self.peek_token().map(|token| token.kind())
    }

    /// Peek the `n`th upcoming significant token (1-based; `peek_n(1)` is the
    /// same token `peek` returns).
    pub(crate) fn peek_n(&self, n: usize) -> Option<TokenKind> {
        self.peek_token_n(n).map(|token| token.kind())
    }

    pub(crate) fn peek_token_n(&self, n: usize) -> Option<Token<'input>> {
        self.current_token
            .iter()
            .cloned()
            .map(Result::Ok)
            .chain(self.lexer.clone())
            .filter_map(Result::ok)
            .filter(|token| token.kind() != TokenKind::Whitespace)
            .nth(n - 1)
    }

    /// Consume the next significant token. Past the end of the stream this
    /// returns a zero-length EOF token rather than failing.
    pub(crate) fn pop(&mut self) -> Token<'input> {
        if let Some(token) = self.current_token.take() {
            return token;
        }
        self.next_token().unwrap_or(Token {
            kind: TokenKind::Eof,
            data: "",
            index: self.source.len(),
        })
    }

    /// Check if the next significant token is `kind`.
    pub(crate) fn at(&mut self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    /// Whether the token stream is exhausted.
    pub(crate) fn at_end(&mut self) -> bool {
        matches!(self.peek(), None | Some(TokenKind::Eof))
    }

    /// Consume the next token if it is `kind`.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token<'input>> {
        if self.at(kind) {
            Some(self.pop())
        } else {
            None
        }
    }

    /// Record a parser error at the current location.
    pub(crate) fn err(&mut self, message: &str) {
        let err = match self.peek_token() {
            Some(token) if token.kind() == TokenKind::Eof => {
                Error::unexpected_eof(message, token.index())
            }
            Some(token) => Error::syntax(message, token.data(), token.index()),
            None => Error::unexpected_eof(message, self.source.len()),
        };
        self.push_err(err);
    }

    /// Record a parser error at the current location and consume the
    /// responsible token.
    pub(crate) fn err_and_pop(&mut self, message: &str) {
        if self.at_end() {
            self.err(message);
            return;
        }
        let token = self.pop();
        self.push_err(Error::syntax(message, token.data(), token.index()));
    }

    /// Record a limit error and silently discard everything after it.
    pub(crate) fn limit_err(&mut self, message: &str) {
        let index = self
            .peek_token()
            .map(|token| token.index())
            .unwrap_or_else(|| self.source.len());
        let err = Error::limit(message, index);
        self.push_err(err);
        self.accept_errors = false;
    }

    /// Push an error to the parser's error list, unless a limit error already
    /// terminated error collection.
    pub(crate) fn push_err(&mut self, err: Error) {
        if self.accept_errors {
            self.errors.push(err);
        }
    }

    /// Track one level of grammar recursion. Returns false (and records a
    /// limit error) once the configured depth is exhausted.
    pub(crate) fn enter_recursion(&mut self) -> bool {
        if self.recursion.try_consume() {
            true
        } else {
            self.limit_err("parser recursion limit reached");
            false
        }
    }

    pub(crate) fn exit_recursion(&mut self) {
        self.recursion.release();
    }

    pub(crate) fn source_text(&self) -> SourceText {
        self.source.clone()
    }

    /// The text view covering `token`.
    pub(crate) fn text(&self, token: &Token<'_>) -> QueryText {
        QueryText::parsed(
            self.source.clone(),
            SourceSpan::new(token.index(), token.len()),
        )
    }

    /// The text view covering `span`.
    pub(crate) fn text_span(&self, span: SourceSpan) -> QueryText {
        QueryText::parsed(self.source.clone(), span)
    }

    /// A zero-length view used for recovery-inserted nodes.
    pub(crate) fn empty_text_at(&self, index: usize) -> QueryText {
        QueryText::parsed(self.source.clone(), SourceSpan::new(index, 0))
    }
}

/// The result of parsing: a best-effort document plus any diagnostics.
///
/// This is not a [`Result`]: there can be both syntax errors and a usable
/// document, since the parser is fault-tolerant.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed document. Present even when parsing reported errors; its
    /// `query` is `None` only for blank input.
    pub document: QueryDocument,
    errors: Vec<Error>,
    recursion: Budget,
    tokens: Budget,
}

impl ParseResult {
    /// Whether parsing completed without any diagnostics.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// The diagnostics collected while parsing.
    pub fn errors(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    /// Recursion-budget utilization while parsing.
    pub fn recursion_budget(&self) -> Budget {
        self.recursion
    }

    /// Token-budget utilization while lexing.
    pub fn token_budget(&self) -> Budget {
        self.tokens
    }
}

/// Parse `input` with the default configuration.
pub fn parse(input: &str) -> ParseResult {
    Parser::new(input).parse()
}
