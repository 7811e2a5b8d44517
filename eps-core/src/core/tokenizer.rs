//! PostScript tokenizer for the interpreter subset.
//!
//! Comments (`%` to end of line) are dropped and the rest is split on runs of
//! whitespace. Line structure carries no meaning past comment stripping.

use std::fmt;

/// Operators understood by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Path construction
    MoveTo,
    LineTo,
    RMoveTo,
    RLineTo,
    CurveTo,
    RCurveTo,
    Arc,
    ArcN,
    ClosePath,
    NewPath,

    // Painting
    Stroke,
    Fill,
    EOFill,
    Clip,
    RectStroke,
    RectFill,

    // Color
    SetGray,
    SetRGBColor,
    SetCMYKColor,

    // Line style
    SetLineWidth,
    SetLineCap,
    SetLineJoin,
    SetMiterLimit,

    // Transforms
    Translate,
    Scale,
    Rotate,

    // Graphics state
    GSave,
    GRestore,

    ShowPage,
}

impl Operator {
    /// Look up an operator by its PostScript name.
    pub fn from_command(cmd: &str) -> Option<Operator> {
        let op = match cmd {
            "moveto" => Operator::MoveTo,
            "lineto" => Operator::LineTo,
            "rmoveto" => Operator::RMoveTo,
            "rlineto" => Operator::RLineTo,
            "curveto" => Operator::CurveTo,
            "rcurveto" => Operator::RCurveTo,
            "arc" => Operator::Arc,
            "arcn" => Operator::ArcN,
            "closepath" => Operator::ClosePath,
            "newpath" => Operator::NewPath,

            "stroke" => Operator::Stroke,
            "fill" => Operator::Fill,
            "eofill" => Operator::EOFill,
            "clip" => Operator::Clip,
            "rectstroke" => Operator::RectStroke,
            "rectfill" => Operator::RectFill,

            "setgray" => Operator::SetGray,
            "setrgbcolor" => Operator::SetRGBColor,
            "setcmykcolor" => Operator::SetCMYKColor,

            "setlinewidth" => Operator::SetLineWidth,
            "setlinecap" => Operator::SetLineCap,
            "setlinejoin" => Operator::SetLineJoin,
            "setmiterlimit" => Operator::SetMiterLimit,

            "translate" => Operator::Translate,
            "scale" => Operator::Scale,
            "rotate" => Operator::Rotate,

            "gsave" => Operator::GSave,
            "grestore" => Operator::GRestore,

            "showpage" => Operator::ShowPage,
            _ => return None,
        };
        Some(op)
    }

    /// The PostScript name of this operator.
    pub fn to_command(&self) -> &'static str {
        match self {
            Operator::MoveTo => "moveto",
            Operator::LineTo => "lineto",
            Operator::RMoveTo => "rmoveto",
            Operator::RLineTo => "rlineto",
            Operator::CurveTo => "curveto",
            Operator::RCurveTo => "rcurveto",
            Operator::Arc => "arc",
            Operator::ArcN => "arcn",
            Operator::ClosePath => "closepath",
            Operator::NewPath => "newpath",
            Operator::Stroke => "stroke",
            Operator::Fill => "fill",
            Operator::EOFill => "eofill",
            Operator::Clip => "clip",
            Operator::RectStroke => "rectstroke",
            Operator::RectFill => "rectfill",
            Operator::SetGray => "setgray",
            Operator::SetRGBColor => "setrgbcolor",
            Operator::SetCMYKColor => "setcmykcolor",
            Operator::SetLineWidth => "setlinewidth",
            Operator::SetLineCap => "setlinecap",
            Operator::SetLineJoin => "setlinejoin",
            Operator::SetMiterLimit => "setmiterlimit",
            Operator::Translate => "translate",
            Operator::Scale => "scale",
            Operator::Rotate => "rotate",
            Operator::GSave => "gsave",
            Operator::GRestore => "grestore",
            Operator::ShowPage => "showpage",
        }
    }

    /// Number of operands the operator consumes.
    pub fn arity(&self) -> usize {
        match self {
            Operator::ClosePath
            | Operator::NewPath
            | Operator::Stroke
            | Operator::Fill
            | Operator::EOFill
            | Operator::Clip
            | Operator::GSave
            | Operator::GRestore
            | Operator::ShowPage => 0,
            Operator::SetGray
            | Operator::SetLineWidth
            | Operator::SetLineCap
            | Operator::SetLineJoin
            | Operator::SetMiterLimit
            | Operator::Rotate => 1,
            Operator::MoveTo
            | Operator::LineTo
            | Operator::RMoveTo
            | Operator::RLineTo
            | Operator::Translate
            | Operator::Scale => 2,
            Operator::SetRGBColor => 3,
            Operator::SetCMYKColor | Operator::RectStroke | Operator::RectFill => 4,
            Operator::Arc | Operator::ArcN => 5,
            Operator::CurveTo | Operator::RCurveTo => 6,
        }
    }

    /// Whether the operator puts ink on the page.
    pub fn is_paint(&self) -> bool {
        matches!(
            self,
            Operator::Stroke
                | Operator::Fill
                | Operator::EOFill
                | Operator::RectStroke
                | Operator::RectFill
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_command())
    }
}

/// A classified token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    /// Numeric literal (integer, real or radix)
    Number(f64),
    /// Known operator
    Operator(Operator),
    /// Name literal such as `/Helvetica`, without the slash
    Name(&'a str),
    /// `def` or `bind`
    Definition(&'a str),
    /// Anything else, kept verbatim
    Opaque(&'a str),
}

impl<'a> Token<'a> {
    /// Classify a single whitespace-free word.
    pub fn classify(word: &'a str) -> Token<'a> {
        if let Some(n) = parse_number(word) {
            return Token::Number(n);
        }
        if let Some(op) = Operator::from_command(word) {
            return Token::Operator(op);
        }
        if let Some(name) = word.strip_prefix('/') {
            return Token::Name(name);
        }
        if word == "def" || word == "bind" {
            return Token::Definition(word);
        }
        Token::Opaque(word)
    }
}

/// Parse a PostScript number. Non-finite values are not numbers here.
pub fn parse_number(word: &str) -> Option<f64> {
    let first = word.as_bytes().first()?;
    if !(first.is_ascii_digit() || matches!(first, b'+' | b'-' | b'.')) {
        return None;
    }
    if let Ok(value) = word.parse::<f64>() {
        return value.is_finite().then_some(value);
    }
    // Radix form: base#digits
    let (base, digits) = word.split_once('#')?;
    let base: u32 = base.parse().ok()?;
    if !(2..=36).contains(&base) {
        return None;
    }
    i64::from_str_radix(digits, base).ok().map(|v| v as f64)
}

/// Tokenize document text lazily, in document order.
pub fn tokenize(text: &str) -> impl Iterator<Item = Token<'_>> + '_ {
    text.split(['\n', '\r'])
        .map(|line| match line.find('%') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .flat_map(str::split_whitespace)
        .map(Token::classify)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_are_stripped() {
        let tokens: Vec<Token> = tokenize("%!PS\n10 20 moveto % trailing\n%%EOF").collect();
        assert_eq!(
            tokens,
            vec![
                Token::Number(10.0),
                Token::Number(20.0),
                Token::Operator(Operator::MoveTo)
            ]
        );
    }

    #[test]
    fn test_tokens_span_lines() {
        let tokens: Vec<Token> = tokenize("1\n2\r\n  lineto").collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2], Token::Operator(Operator::LineTo));
    }

    #[test]
    fn test_classification() {
        assert_eq!(Token::classify("/Helvetica"), Token::Name("Helvetica"));
        assert_eq!(Token::classify("def"), Token::Definition("def"));
        assert_eq!(Token::classify("bind"), Token::Definition("bind"));
        assert_eq!(Token::classify("findfont"), Token::Opaque("findfont"));
        assert_eq!(Token::classify("-.5"), Token::Number(-0.5));
        assert_eq!(Token::classify("1e2"), Token::Number(100.0));
        assert_eq!(Token::classify("16#FF"), Token::Number(255.0));
        assert_eq!(Token::classify("inf"), Token::Opaque("inf"));
        assert_eq!(Token::classify("NaN"), Token::Opaque("NaN"));
    }

    #[test]
    fn test_operator_names_round_trip() {
        for name in ["moveto", "arcn", "setcmykcolor", "rectfill", "showpage"] {
            let op = Operator::from_command(name).unwrap();
            assert_eq!(op.to_command(), name);
        }
        assert_eq!(Operator::from_command("image"), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(Operator::CurveTo.arity(), 6);
        assert_eq!(Operator::Arc.arity(), 5);
        assert_eq!(Operator::SetCMYKColor.arity(), 4);
        assert_eq!(Operator::GSave.arity(), 0);
    }
}
