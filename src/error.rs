use crate::token::{Token, TokenKind};

/// Writes a diagnostic to stderr. Lines are tracked 0-based internally and
/// reported 1-based, so the translation happens here and nowhere else.
pub fn report(line: usize, message: &str) {
    eprintln!("[line {}] Error: {}", line + 1, message);
}

/// Diagnostics for the scanner's error tokens.
pub fn report_token(source: &str, token: Token) {
    let lexeme = String::from_utf8_lossy(&source.as_bytes()[token.start..token.end]);
    match token.kind {
        TokenKind::Invalid => report(token.line, &format!("Invalid character: {}", lexeme)),
        TokenKind::UnclosedString => report(token.line, &format!("Unclosed string: {}", lexeme)),
        _ => {}
    }
}
