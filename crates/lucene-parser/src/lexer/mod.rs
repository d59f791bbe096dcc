mod cursor;

use crate::diagnostics::{Budget, Error};
use cursor::Cursor;

/// The kind of a [`Token`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    Ident,
    Phrase,
    Regex,
    Number,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Plus,
    Minus,
    Bang,
    Caret,
    Tilde,
    Star,
    Question,
    And,
    Or,
    Not,
    To,
    Gt,
    Ge,
    Lt,
    Le,
    /// `||` written directly after a date-like identifier, kept distinct from
    /// [`TokenKind::Or`] so the parser can fold it into a date-math term.
    PipePipe,
    Eof,
}

impl TokenKind {
    fn name(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "WS",
            TokenKind::Ident => "IDENT",
            TokenKind::Phrase => "PHRASE",
            TokenKind::Regex => "REGEX",
            TokenKind::Number => "NUMBER",
            TokenKind::LParen => "L_PAREN",
            TokenKind::RParen => "R_PAREN",
            TokenKind::LBracket => "L_BRACK",
            TokenKind::RBracket => "R_BRACK",
            TokenKind::LBrace => "L_BRACE",
            TokenKind::RBrace => "R_BRACE",
            TokenKind::Colon => "COLON",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Bang => "BANG",
            TokenKind::Caret => "CARET",
            TokenKind::Tilde => "TILDE",
            TokenKind::Star => "STAR",
            TokenKind::Question => "QMARK",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::To => "TO",
            TokenKind::Gt => "GT",
            TokenKind::Ge => "GE",
            TokenKind::Lt => "LT",
            TokenKind::Le => "LE",
            TokenKind::PipePipe => "PIPE_PIPE",
            TokenKind::Eof => "EOF",
        }
    }
}

/// A token produced by the [`Lexer`]. `data` is the raw slice of the input
/// the token covers; `index` its byte offset.
#[derive(Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) data: &'a str,
    pub(crate) index: usize,
}

impl<'a> Token<'a> {
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The raw input fragment this token covers.
    pub fn data(&self) -> &'a str {
        self.data
    }

    /// Byte offset of the token in the input.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte offset one past the end of the token.
    pub fn end(&self) -> usize {
        self.index + self.data.len()
    }
}

impl std::fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}:{} {:?}",
            self.kind.name(),
            self.index,
            self.end(),
            self.data
        )
    }
}

/// A single-pass tokenizer over a Lucene-style query string.
///
/// The lexer is a lazy iterator of `Result<Token, Error>`. It never fails
/// fatally: an unrecognized byte yields an `Err` item covering that byte and
/// lexing continues right after it. Whitespace is preserved as its own token
/// kind, and the final token is [`TokenKind::Eof`].
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    finished: bool,
    pending_error: Option<Error>,
    budget: Budget,
    /// End offset of the last date-like identifier, for deciding whether a
    /// directly following `||` is [`TokenKind::PipePipe`].
    date_anchor_end: Option<usize>,
    /// The token after `||` is a date-math tail, where `/` means rounding
    /// rather than a regex delimiter.
    date_tail: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            finished: false,
            pending_error: None,
            budget: Budget::unlimited(),
            date_anchor_end: None,
            date_tail: false,
        }
    }

    /// Abort lexing with an error after `limit` tokens.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.budget = Budget::limited(limit);
        self
    }

    /// Utilization of the configured token budget.
    pub fn budget(&self) -> Budget {
        self.budget
    }

    fn advance(&mut self) -> Result<Token<'a>, Error> {
        let index = self.offset;
        let mut cur = Cursor::new(&self.input[index..]);
        let first = match cur.first() {
            Some(c) => c,
            None => {
                self.finished = true;
                return Ok(Token {
                    kind: TokenKind::Eof,
                    data: "",
                    index,
                });
            }
        };

        if self.date_tail {
            self.date_tail = false;
            if is_date_tail_char(first) {
                cur.eat_while(is_date_tail_char);
                let token = self.token(TokenKind::Ident, cur);
                if starts_with_date_digits(token.data) {
                    self.date_anchor_end = Some(token.end());
                }
                return Ok(token);
            }
        }

        let date_anchor_end = self.date_anchor_end.take();

        match first {
            c if is_whitespace(c) => {
                cur.eat_while(is_whitespace);
                Ok(self.token(TokenKind::Whitespace, cur))
            }
            '"' => self.phrase(cur),
            '/' => self.regex(cur),
            '(' => Ok(self.single(TokenKind::LParen, cur)),
            ')' => Ok(self.single(TokenKind::RParen, cur)),
            '[' => Ok(self.single(TokenKind::LBracket, cur)),
            ']' => Ok(self.single(TokenKind::RBracket, cur)),
            '{' => Ok(self.single(TokenKind::LBrace, cur)),
            '}' => Ok(self.single(TokenKind::RBrace, cur)),
            ':' => Ok(self.single(TokenKind::Colon, cur)),
            '^' => Ok(self.single(TokenKind::Caret, cur)),
            '~' => Ok(self.single(TokenKind::Tilde, cur)),
            '!' => Ok(self.single(TokenKind::Bang, cur)),
            '+' => Ok(self.single(TokenKind::Plus, cur)),
            '-' => Ok(self.single(TokenKind::Minus, cur)),
            '>' => {
                cur.bump();
                let kind = if cur.eatc('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                };
                Ok(self.token(kind, cur))
            }
            '<' => {
                cur.bump();
                let kind = if cur.eatc('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                };
                Ok(self.token(kind, cur))
            }
            '&' => {
                cur.bump();
                if cur.eatc('&') {
                    Ok(self.token(TokenKind::And, cur))
                } else {
                    Err(self.error_token(cur, "unexpected character: `&`"))
                }
            }
            '|' => {
                cur.bump();
                if cur.eatc('|') {
                    if date_anchor_end == Some(index) {
                        self.date_tail = true;
                        Ok(self.token(TokenKind::PipePipe, cur))
                    } else {
                        Ok(self.token(TokenKind::Or, cur))
                    }
                } else {
                    Err(self.error_token(cur, "unexpected character: `|`"))
                }
            }
            c if is_ident_char(c) || c == '\\' => Ok(self.ident(cur)),
            c => {
                cur.bump();
                Err(self.error_token(cur, format!("unexpected character: `{c}`")))
            }
        }
    }

    fn single(&mut self, kind: TokenKind, mut cur: Cursor<'a>) -> Token<'a> {
        cur.bump();
        self.token(kind, cur)
    }

    fn token(&mut self, kind: TokenKind, cur: Cursor<'a>) -> Token<'a> {
        let index = self.offset;
        let data = cur.slice();
        self.offset += data.len();
        Token { kind, data, index }
    }

    fn error_token(&mut self, cur: Cursor<'a>, message: impl Into<String>) -> Error {
        let index = self.offset;
        let data = cur.slice();
        self.offset += data.len();
        Error::lexical(message, data, index)
    }

    fn ident(&mut self, mut cur: Cursor<'a>) -> Token<'a> {
        loop {
            match cur.first() {
                Some('\\') if cur.second().is_some() => {
                    cur.bump();
                    cur.bump();
                }
                Some('\\') => {
                    cur.bump();
                }
                Some(c) if is_ident_continue(c) => {
                    cur.bump();
                }
                _ => break,
            }
        }
        let kind = classify_ident(cur.slice());
        let token = self.token(kind, cur);
        if starts_with_date_digits(token.data) {
            self.date_anchor_end = Some(token.end());
        }
        token
    }

    fn phrase(&mut self, mut cur: Cursor<'a>) -> Result<Token<'a>, Error> {
        cur.bump(); // opening quote
        let mut terminated = false;
        while let Some(c) = cur.bump() {
            match c {
                '\\' => {
                    if matches!(cur.first(), Some('"') | Some('\\')) {
                        cur.bump();
                    }
                }
                '"' => {
                    terminated = true;
                    break;
                }
                _ => {}
            }
        }
        let index = self.offset;
        let token = self.token(TokenKind::Phrase, cur);
        if !terminated {
            self.pending_error = Some(Error::lexical("unterminated phrase", token.data, index));
        }
        Ok(token)
    }

    fn regex(&mut self, mut cur: Cursor<'a>) -> Result<Token<'a>, Error> {
        cur.bump(); // opening slash
        let mut terminated = false;
        let mut in_class = false;
        while let Some(c) = cur.bump() {
            match c {
                '\\' => {
                    cur.bump();
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    terminated = true;
                    break;
                }
                _ => {}
            }
        }
        let index = self.offset;
        let token = self.token(TokenKind::Regex, cur);
        if !terminated {
            self.pending_error = Some(Error::lexical(
                "unterminated regular expression",
                token.data,
                index,
            ));
        }
        Ok(token)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }
        if self.finished {
            return None;
        }

        if !self.budget.try_consume() {
            self.finished = true;
            return Some(Err(Error::limit(
                "token limit reached, aborting lexing",
                self.offset,
            )));
        }

        if self.offset >= self.input.len() {
            self.finished = true;
            return Some(Ok(Token {
                kind: TokenKind::Eof,
                data: "",
                index: self.offset,
            }));
        }

        Some(self.advance())
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_char(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.' | '@' | '-' | '*' | '?')
}

// `/` continues an identifier (`now-1d/d`, `a/b`) but never starts one; a
// token-initial slash opens a regex literal.
fn is_ident_continue(c: char) -> bool {
    is_ident_char(c) || c == '/'
}

fn is_date_tail_char(c: char) -> bool {
    matches!(c, '0'..='9' | '+' | '-' | '/' | 'y' | 'M' | 'w' | 'd' | 'h' | 'H' | 'm' | 's')
}

fn classify_ident(data: &str) -> TokenKind {
    match data {
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "TO" => TokenKind::To,
        "*" => TokenKind::Star,
        "?" => TokenKind::Question,
        _ if is_number(data) => TokenKind::Number,
        _ => TokenKind::Ident,
    }
}

fn is_number(data: &str) -> bool {
    let mut parts = data.split('.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next();
    if parts.next().is_some() {
        return false;
    }
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

fn starts_with_date_digits(data: &str) -> bool {
    data.len() >= 4 && data.bytes().take(4).all(|b| b.is_ascii_digit())
}
