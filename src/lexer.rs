use crate::token::{Token, TokenKind};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::{trace, warn};

struct Lexer<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    start_line: usize,
    start_column: usize,
    line: usize,
    column: usize,
}

/// Splits `source` into tokens, always ending with exactly one `Eof`.
///
/// Never fails: characters that start no valid lexeme and unterminated string
/// literals come back as `TokenKind::Unknown` tokens for the parser to reject.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        start_line: 1,
        start_column: 1,
        line: 1,
        column: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();

    loop {
        lexer.skip_whitespace_and_comments();
        match lexer.iter.peek() {
            Some((idx, _)) => {
                lexer.start = *idx;
                lexer.start_line = lexer.line;
                lexer.start_column = lexer.column;
            }
            None => break,
        }
        let token = lexer.scan_token();
        if token.kind == TokenKind::Unknown {
            warn!(
                line = token.line,
                column = token.column,
                text = token.text.as_str(),
                "unrecognized input"
            );
        }
        tokens.push(token);
    }
    tokens.push(Token::new(TokenKind::Eof, "", lexer.line, lexer.column));
    trace!(count = tokens.len(), "tokenized source");
    tokens
}

impl<'a> Lexer<'a> {
    fn scan_token(&mut self) -> Token {
        let c = match self.advance() {
            Some((_, c)) => c,
            None => return self.token(TokenKind::Eof),
        };
        match c {
            '(' => self.token(TokenKind::LeftParen),
            ')' => self.token(TokenKind::RightParen),
            '{' => self.token(TokenKind::LeftBrace),
            '}' => self.token(TokenKind::RightBrace),
            '[' => self.token(TokenKind::LeftBracket),
            ']' => self.token(TokenKind::RightBracket),
            ';' => self.token(TokenKind::Semicolon),
            ',' => self.token(TokenKind::Comma),
            '.' => self.token(TokenKind::Dot),
            ':' => self.token(TokenKind::Colon),
            '?' => self.token(TokenKind::Question),
            '"' | '\'' => self.string(c),
            '0'..='9' => self.number(),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier(),
            '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' | '&' | '|' | '^' | '~' => {
                self.operator()
            }
            _ => self.token(TokenKind::Unknown),
        }
    }
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\r' | '\t' | '\n' => {
                    self.advance();
                }
                '/' => match self.peek_nth(1) {
                    Some('/') => {
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        while let Some(c) = self.peek() {
                            if c == '*' && self.peek_nth(1) == Some('/') {
                                self.advance();
                                self.advance();
                                break;
                            }
                            self.advance();
                        }
                    }
                    _ => return,
                },
                _ => return,
            }
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, kind: TokenKind) -> Token {
        let current = self.current();
        Token::new(
            kind,
            &self.source[self.start..current],
            self.start_line,
            self.start_column,
        )
    }
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().map(|(_, c)| *c)
    }
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.iter.clone().nth(n).map(|(_, c)| c)
    }
    fn advance(&mut self) -> Option<(usize, char)> {
        let next = self.iter.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }
    fn string(&mut self, quote: char) -> Token {
        let mut text = String::new();
        loop {
            match self.advance() {
                None => return self.token(TokenKind::Unknown),
                Some((_, '\\')) => match self.advance() {
                    None => return self.token(TokenKind::Unknown),
                    Some((_, escaped)) => text.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    }),
                },
                Some((_, c)) if c == quote => break,
                Some((_, c)) => text.push(c),
            }
        }
        Token::new(TokenKind::String, text, self.start_line, self.start_column)
    }
    fn number(&mut self) -> Token {
        let mut kind = TokenKind::Integer;
        self.digits();

        if self.peek() == Some('.') && self.peek_nth(1).map_or(false, |c| c.is_ascii_digit()) {
            kind = TokenKind::Float;
            self.advance();
            self.digits();
        }

        if let Some('e') | Some('E') = self.peek() {
            let exponent_digits = match self.peek_nth(1) {
                Some('+') | Some('-') => self.peek_nth(2).map_or(false, |c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_digits {
                kind = TokenKind::Float;
                self.advance();
                if let Some('+') | Some('-') = self.peek() {
                    self.advance();
                }
                self.digits();
            }
        }

        self.token(kind)
    }
    fn digits(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.advance();
        }
    }
    fn identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    self.advance();
                }
                _ => {
                    break;
                }
            }
        }
        let current = self.current();
        match KEYWORDS.get(&self.source[self.start..current]) {
            None => self.token(TokenKind::Identifier),
            Some(kind) => self.token(*kind),
        }
    }
    fn operator(&mut self) -> Token {
        // The first character is already consumed; try the longest spelling first.
        for len in (2..=3).rev() {
            let candidate = match self.source.get(self.start..self.start + len) {
                Some(candidate) => candidate,
                None => continue,
            };
            if let Some(kind) = OPERATORS.get(candidate) {
                for _ in 1..len {
                    self.advance();
                }
                return self.token(*kind);
            }
        }
        let current = self.current();
        match OPERATORS.get(&self.source[self.start..current]) {
            Some(kind) => self.token(*kind),
            None => self.token(TokenKind::Unknown),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "switch" => TokenKind::Switch,
    "case" => TokenKind::Case,
    "default" => TokenKind::Default,
    "for" => TokenKind::For,
    "while" => TokenKind::While,
    "do" => TokenKind::Do,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "return" => TokenKind::Return,
    "try" => TokenKind::Try,
    "catch" => TokenKind::Catch,
    "finally" => TokenKind::Finally,
    "throw" => TokenKind::Throw,
    "new" => TokenKind::New,
    "delete" => TokenKind::Delete,
    "function" => TokenKind::Function,
    "class" => TokenKind::Class,
    "let" => TokenKind::Let,
    "const" => TokenKind::Const,
    "var" => TokenKind::Var,
    "static" => TokenKind::Static,
    "true" => TokenKind::Boolean,
    "false" => TokenKind::Boolean,
    "null" => TokenKind::Null,
};

static OPERATORS: phf::Map<&'static str, TokenKind> = phf_map! {
    "+" => TokenKind::Plus,
    "-" => TokenKind::Minus,
    "*" => TokenKind::Star,
    "/" => TokenKind::Slash,
    "%" => TokenKind::Percent,
    "++" => TokenKind::PlusPlus,
    "--" => TokenKind::MinusMinus,
    "=" => TokenKind::Equal,
    "+=" => TokenKind::PlusEqual,
    "-=" => TokenKind::MinusEqual,
    "*=" => TokenKind::StarEqual,
    "/=" => TokenKind::SlashEqual,
    "%=" => TokenKind::PercentEqual,
    "==" => TokenKind::EqualEqual,
    "!=" => TokenKind::BangEqual,
    "===" => TokenKind::EqualEqualEqual,
    "!==" => TokenKind::BangEqualEqual,
    "<" => TokenKind::Less,
    ">" => TokenKind::Greater,
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
    "&&" => TokenKind::AndAnd,
    "||" => TokenKind::OrOr,
    "!" => TokenKind::Bang,
    "&" => TokenKind::Ampersand,
    "|" => TokenKind::Pipe,
    "^" => TokenKind::Caret,
    "~" => TokenKind::Tilde,
    "<<" => TokenKind::LessLess,
    ">>" => TokenKind::GreaterGreater,
    ">>>" => TokenKind::GreaterGreaterGreater,
};
