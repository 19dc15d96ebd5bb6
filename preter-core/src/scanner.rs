use phf::{phf_map, Map};

use crate::error::Error;
use crate::report::Reporter;
use crate::token::{Literal, Token, Type};

static KEYWORDS: Map<&'static str, Type> = phf_map! {
    "and" => Type::And,
    "class" => Type::Class,
    "else" => Type::Else,
    "false" => Type::False,
    "for" => Type::For,
    "fun" => Type::Fun,
    "if" => Type::If,
    "nil" => Type::Nil,
    "or" => Type::Or,
    "print" => Type::Print,
    "return" => Type::Return,
    "super" => Type::Super,
    "this" => Type::This,
    "true" => Type::True,
    "var" => Type::Var,
    "while" => Type::While,
};

/// Single pass scanner over the source text. Tokens are produced lazily through `Iterator`;
/// lexical errors are written to the reporter and scanning carries on with the next character,
/// so the stream always ends with exactly one `Eof` token.
pub struct Scanner<'a> {
    src: Vec<char>,
    reporter: &'a mut Reporter,
    line: usize,

    // `start` and `current` points to the start and end of the token being scanned
    start: usize,
    current: usize,

    // Set once the eof token has been emitted, the iterator is fused after that.
    eof: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &str, reporter: &'a mut Reporter) -> Self {
        Scanner {
            src: src.chars().collect(),
            reporter,
            line: 1,
            start: 0,
            current: 0,
            eof: false,
        }
    }

    pub fn scan_tokens(self) -> Vec<Token> {
        let tokens: Vec<Token> = self.collect();
        tracing::debug!(count = tokens.len(), "scanned tokens");
        tokens
    }

    fn scan_token(&mut self) -> Result<Option<Token>, Error> {
        let c = self.advance();

        let token = match c {
            '(' => Some(self.make_token(Type::LeftParen)),
            ')' => Some(self.make_token(Type::RightParen)),
            '{' => Some(self.make_token(Type::LeftBrace)),
            '}' => Some(self.make_token(Type::RightBrace)),
            ',' => Some(self.make_token(Type::Comma)),
            '.' => Some(self.make_token(Type::Dot)),
            '-' => Some(self.make_token(Type::Minus)),
            '+' => Some(self.make_token(Type::Plus)),
            ';' => Some(self.make_token(Type::SemiColon)),
            '*' => Some(self.make_token(Type::Star)),

            '!' => Some(self.either('=', Type::BangEqual, Type::Bang)),
            '=' => Some(self.either('=', Type::EqualEqual, Type::Equal)),
            '<' => Some(self.either('=', Type::LessEqual, Type::Less)),
            '>' => Some(self.either('=', Type::GreaterEqual, Type::Greater)),

            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    None
                } else if self.match_char('*') {
                    self.block_comment()?;
                    None
                } else {
                    Some(self.make_token(Type::Slash))
                }
            }

            '"' => Some(self.string()?),

            // White spaces, do nothing
            ' ' | '\t' | '\r' => None,

            '\n' => {
                self.line += 1;
                None
            }

            _ => {
                if c.is_ascii_digit() {
                    Some(self.number())
                } else if c.is_alphabetic() {
                    Some(self.identifier())
                } else {
                    return Err(Error::UnexpectedCharacter {
                        ch: c,
                        line: self.line,
                    });
                }
            }
        };

        Ok(token)
    }

    fn either(&mut self, next: char, double: Type, single: Type) -> Token {
        if self.match_char(next) {
            self.make_token(double)
        } else {
            self.make_token(single)
        }
    }

    fn block_comment(&mut self) -> Result<(), Error> {
        while !self.is_at_end() {
            let now = self.advance();
            if now == '\n' {
                self.line += 1;
            } else if now == '*' && self.match_char('/') {
                return Ok(());
            }
        }

        Err(Error::UnterminatedBlockComment { line: self.line })
    }

    fn string(&mut self) -> Result<Token, Error> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }

            self.advance();
        }

        if self.is_at_end() {
            return Err(Error::UnterminatedString { line: self.line });
        }

        // consume the closing "
        self.advance();
        let value = self.text(self.start + 1, self.current - 1);
        Ok(self.make_token_with_val(Type::String, Literal::Str(value)))
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A trailing '.' is left for the next token
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Only ascii digits with at most one inner '.' reach here, which always parses.
        let value = self
            .text(self.start, self.current)
            .parse::<f64>()
            .unwrap_or_default();
        self.make_token_with_val(Type::Number, Literal::Num(value))
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_alphanumeric() {
            self.advance();
        }

        let text = self.text(self.start, self.current);
        match KEYWORDS.get(text.as_str()) {
            Some(keyword) => self.make_token(*keyword),
            None => self.make_token(Type::Identifier),
        }
    }

    fn text(&self, from: usize, to: usize) -> String {
        self.src[from..to].iter().collect()
    }

    fn peek(&self) -> char {
        self.src.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.src.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let res = self.peek();
        self.current += 1;
        res
    }

    fn match_char(&mut self, c: char) -> bool {
        if self.is_at_end() || self.peek() != c {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.src.len()
    }

    fn make_token(&self, ty: Type) -> Token {
        let lexeme = match ty {
            Type::Eof => String::new(),
            _ => self.text(self.start, self.current),
        };

        Token::new(ty, lexeme, None, self.line)
    }

    fn make_token_with_val(&self, ty: Type, val: Literal) -> Token {
        let mut token = self.make_token(ty);
        token.literal = Some(val);
        token
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.current;

            match self.scan_token() {
                Ok(None) => continue,
                Ok(Some(token)) => return Some(token),
                Err(err) => self.reporter.scan_error(&err),
            }
        }

        self.eof = true;
        self.start = self.current;
        Some(self.make_token(Type::Eof))
    }
}
