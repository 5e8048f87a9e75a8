use strum_macros::Display;

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenKind {
    // Keywords.
    #[strum(serialize = "if")] If,
    #[strum(serialize = "else")] Else,
    #[strum(serialize = "switch")] Switch,
    #[strum(serialize = "case")] Case,
    #[strum(serialize = "default")] Default,
    #[strum(serialize = "for")] For,
    #[strum(serialize = "while")] While,
    #[strum(serialize = "do")] Do,
    #[strum(serialize = "break")] Break,
    #[strum(serialize = "continue")] Continue,
    #[strum(serialize = "return")] Return,
    #[strum(serialize = "try")] Try,
    #[strum(serialize = "catch")] Catch,
    #[strum(serialize = "finally")] Finally,
    #[strum(serialize = "throw")] Throw,
    #[strum(serialize = "new")] New,
    #[strum(serialize = "delete")] Delete,
    #[strum(serialize = "function")] Function,
    #[strum(serialize = "class")] Class,
    #[strum(serialize = "let")] Let,
    #[strum(serialize = "const")] Const,
    #[strum(serialize = "var")] Var,
    #[strum(serialize = "static")] Static,

    // Literals.
    #[strum(serialize = "identifier")] Identifier,
    #[strum(serialize = "integer")] Integer,
    #[strum(serialize = "float")] Float,
    #[strum(serialize = "string")] String,
    #[strum(serialize = "boolean")] Boolean,
    #[strum(serialize = "null")] Null,

    // Operators.
    #[strum(serialize = "+")] Plus,
    #[strum(serialize = "-")] Minus,
    #[strum(serialize = "*")] Star,
    #[strum(serialize = "/")] Slash,
    #[strum(serialize = "%")] Percent,
    #[strum(serialize = "++")] PlusPlus,
    #[strum(serialize = "--")] MinusMinus,
    #[strum(serialize = "=")] Equal,
    #[strum(serialize = "+=")] PlusEqual,
    #[strum(serialize = "-=")] MinusEqual,
    #[strum(serialize = "*=")] StarEqual,
    #[strum(serialize = "/=")] SlashEqual,
    #[strum(serialize = "%=")] PercentEqual,
    #[strum(serialize = "==")] EqualEqual,
    #[strum(serialize = "!=")] BangEqual,
    #[strum(serialize = "===")] EqualEqualEqual,
    #[strum(serialize = "!==")] BangEqualEqual,
    #[strum(serialize = "<")] Less,
    #[strum(serialize = ">")] Greater,
    #[strum(serialize = "<=")] LessEqual,
    #[strum(serialize = ">=")] GreaterEqual,
    #[strum(serialize = "&&")] AndAnd,
    #[strum(serialize = "||")] OrOr,
    #[strum(serialize = "!")] Bang,
    #[strum(serialize = "&")] Ampersand,
    #[strum(serialize = "|")] Pipe,
    #[strum(serialize = "^")] Caret,
    #[strum(serialize = "~")] Tilde,
    #[strum(serialize = "<<")] LessLess,
    #[strum(serialize = ">>")] GreaterGreater,
    #[strum(serialize = ">>>")] GreaterGreaterGreater,

    // Separators.
    #[strum(serialize = "(")] LeftParen,
    #[strum(serialize = ")")] RightParen,
    #[strum(serialize = "{")] LeftBrace,
    #[strum(serialize = "}")] RightBrace,
    #[strum(serialize = "[")] LeftBracket,
    #[strum(serialize = "]")] RightBracket,
    #[strum(serialize = ";")] Semicolon,
    #[strum(serialize = ",")] Comma,
    #[strum(serialize = ".")] Dot,
    #[strum(serialize = ":")] Colon,
    #[strum(serialize = "?")] Question,

    #[strum(serialize = "end of input")] Eof,
    #[strum(serialize = "unknown")] Unknown,
}

/// A single lexeme. `text` holds the decoded contents for string literals and
/// the raw source slice for everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}
