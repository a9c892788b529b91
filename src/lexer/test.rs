use super::*;
use logos::Logos;

#[test]
fn test_basic_tokens() {
    let input = "
    fn add(int a) -> int { return a + 1; }
    ";
    let mut lexer = Token::lexer(input);

    assert_eq!(lexer.next(), Some(Ok(Token::KeywordFn)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("add".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::LParen)));
    assert_eq!(lexer.next(), Some(Ok(Token::TyInt)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("a".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::RParen)));
    assert_eq!(lexer.next(), Some(Ok(Token::Arrow)));
    assert_eq!(lexer.next(), Some(Ok(Token::TyInt)));
    assert_eq!(lexer.next(), Some(Ok(Token::LBrace)));
    assert_eq!(lexer.next(), Some(Ok(Token::KeywordReturn)));
}

#[test]
fn test_numbers() {
    let mut lexer = Token::lexer("12 3.5 0.25");
    assert_eq!(lexer.next(), Some(Ok(Token::Int(12))));
    assert_eq!(lexer.next(), Some(Ok(Token::Float(3.5))));
    assert_eq!(lexer.next(), Some(Ok(Token::Float(0.25))));
}

#[test]
fn test_compound_operators() {
    let mut lexer = Token::lexer("++ -- <= >= == != && || -> ... < =");
    assert_eq!(lexer.next(), Some(Ok(Token::Increment)));
    assert_eq!(lexer.next(), Some(Ok(Token::Decrement)));
    assert_eq!(lexer.next(), Some(Ok(Token::LessEqual)));
    assert_eq!(lexer.next(), Some(Ok(Token::GreaterEqual)));
    assert_eq!(lexer.next(), Some(Ok(Token::EqualEqual)));
    assert_eq!(lexer.next(), Some(Ok(Token::NotEqual)));
    assert_eq!(lexer.next(), Some(Ok(Token::AndAnd)));
    assert_eq!(lexer.next(), Some(Ok(Token::OrOr)));
    assert_eq!(lexer.next(), Some(Ok(Token::Arrow)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ellipsis)));
    assert_eq!(lexer.next(), Some(Ok(Token::Less)));
    assert_eq!(lexer.next(), Some(Ok(Token::Assign)));
}

#[test]
fn test_string_token() {
    let input = r#""hello\nworld""#;
    let mut lexer = Token::lexer(input);
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::Str("hello\nworld".to_string())))
    );
}

#[test]
fn test_keyword_vs_identifier() {
    let mut lexer = Token::lexer("for forty int interest");
    assert_eq!(lexer.next(), Some(Ok(Token::KeywordFor)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("forty".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::TyInt)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("interest".to_string()))));
}

#[test]
fn test_comments_skipped() {
    let mut lexer = Token::lexer("1 # the rest is ignored\n2");
    assert_eq!(lexer.next(), Some(Ok(Token::Int(1))));
    assert_eq!(lexer.next(), Some(Ok(Token::Int(2))));
    assert_eq!(lexer.next(), None);
}

#[test]
fn test_stream_rejects_bad_token() {
    let err = TokenStream::new("int x = @;").unwrap_err();
    assert_eq!(err.kind, crate::error::ErrorKind::Syntax);
    assert_eq!(err.span, 8..9);
}

#[test]
fn test_stream_rewind() {
    let mut stream = TokenStream::new("v = 1").unwrap();
    let (first, first_span) = stream.next().unwrap();
    assert_eq!(first, Token::Ident("v".to_string()));
    assert_eq!(first_span, 0..1);
    assert_eq!(stream.peek().unwrap().0, Token::Assign);

    stream.rewind();
    assert_eq!(stream.peek().unwrap().0, Token::Ident("v".to_string()));
}

#[test]
fn test_stream_spans_are_adjacent_for_signed_literal() {
    let stream = TokenStream::new("-1-21.2;").unwrap();
    let (_, sign) = stream.peek().unwrap().clone();
    let (_, number) = stream.peek_second().unwrap().clone();
    assert_eq!(sign.end, number.start);
}
