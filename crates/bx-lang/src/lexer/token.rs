use bx_core::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Var,
    Function,
    If,
    Else,
    For,
    In,
    While,
    Do,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    Rethrow,
    Break,
    Continue,
    Return,
    New,
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Xor,
    Mod,
    Eq,
    Neq,
    Is,
    Gt,
    Gte,
    Ge,
    Lt,
    Lte,
    Le,
    Contains,
}

impl Keyword {
    /// Keywords are matched case-insensitively.
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        let keyword = match lexeme.to_ascii_lowercase().as_str() {
            "var" => Self::Var,
            "function" => Self::Function,
            "if" => Self::If,
            "else" => Self::Else,
            "for" => Self::For,
            "in" => Self::In,
            "while" => Self::While,
            "do" => Self::Do,
            "switch" => Self::Switch,
            "case" => Self::Case,
            "default" => Self::Default,
            "try" => Self::Try,
            "catch" => Self::Catch,
            "finally" => Self::Finally,
            "throw" => Self::Throw,
            "rethrow" => Self::Rethrow,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "return" => Self::Return,
            "new" => Self::New,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "xor" => Self::Xor,
            "mod" => Self::Mod,
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "is" => Self::Is,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "ge" => Self::Ge,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "le" => Self::Le,
            "contains" => Self::Contains,
            _ => return None,
        };
        Some(keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text for most tokens. String text is stored unescaped and tag
    /// names are lower-cased without their `cf`/`bx:` prefix.
    pub lexeme: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Keyword(Keyword),
    Symbol,
    /// Opening quote of a string; the lexeme is the quote character.
    StringStart,
    StringText,
    StringEnd,
    /// `#` opening an interpolated expression.
    HashOpen,
    HashClose,
    /// Literal template text between tags.
    Text,
    /// `<cfNAME`; attributes or an expression follow, then `TagEnd`/`TagSelfClose`.
    TagOpen,
    TagEnd,
    TagSelfClose,
    /// `</cfNAME>` in one token.
    TagClose,
    Eof,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.lexeme == symbol
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Identifier with this name, ignoring case.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.lexeme.eq_ignore_ascii_case(word)
    }

    pub fn is_tag_open(&self, name: &str) -> bool {
        self.kind == TokenKind::TagOpen && self.lexeme == name
    }

    pub fn is_tag_close(&self, name: &str) -> bool {
        self.kind == TokenKind::TagClose && self.lexeme == name
    }

    /// Human-readable rendering used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::StringStart => "string".to_string(),
            TokenKind::StringText => "string text".to_string(),
            TokenKind::StringEnd => "end of string".to_string(),
            TokenKind::HashOpen | TokenKind::HashClose => "`#`".to_string(),
            TokenKind::Text => "text".to_string(),
            TokenKind::TagOpen => format!("`<cf{}`", self.lexeme),
            TokenKind::TagClose => format!("`</cf{}>`", self.lexeme),
            TokenKind::TagEnd => "`>`".to_string(),
            TokenKind::TagSelfClose => "`/>`".to_string(),
            _ => format!("`{}`", self.lexeme),
        }
    }
}
