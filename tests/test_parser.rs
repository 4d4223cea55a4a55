use courier::http::headers::HeaderError;
use courier::http::limits::Limits;
use courier::http::parser::{ParseError, ParseState, RequestParser};
use courier::http::request::{Method, Request};

/// Feeds `data` to a fresh parser `step` bytes at a time, keeping unconsumed
/// bytes around the way the read buffer does.
fn parse_in_steps(data: &[u8], step: usize) -> Result<RequestParser, ParseError> {
    let mut parser = RequestParser::new();
    let mut pending = Vec::new();

    for piece in data.chunks(step) {
        pending.extend_from_slice(piece);
        let consumed = parser.parse(&pending)?;
        pending.drain(..consumed);
        if parser.is_done() {
            break;
        }
    }

    Ok(parser)
}

fn parse_whole(data: &[u8]) -> Result<Option<Request>, ParseError> {
    parse_in_steps(data, data.len()).map(RequestParser::into_request)
}

/// Chunked request whose first chunk-size line is `3;x=` plus `ext_len` bytes
/// of extension value.
fn chunked_with_extension(ext_len: usize) -> Vec<u8> {
    let mut req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3;x=".to_vec();
    req.extend(std::iter::repeat_n(b'a', ext_len));
    req.extend_from_slice(b"\r\nabc\r\n0\r\n\r\n");
    req
}

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n";
    let mut parser = RequestParser::new();
    let consumed = parser.parse(req).unwrap();

    assert_eq!(consumed, req.len());
    assert!(parser.is_done());

    let parsed = parser.into_request().unwrap();
    assert_eq!(parsed.method(), &Method::GET);
    assert_eq!(parsed.target(), "/");
    assert_eq!(parsed.line.version, "1.1");
    assert_eq!(parsed.header("Host"), Some("localhost:42069"));
    assert_eq!(parsed.header("user-agent"), Some("curl/7.81.0"));
    assert!(parsed.body.is_empty());
}

#[test]
fn test_parse_independent_of_chunk_size() {
    let req = b"POST /coffee HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 13\r\n\r\nhello world!\n";
    let whole = parse_whole(req).unwrap().unwrap();
    assert_eq!(whole.method(), &Method::POST);
    assert_eq!(whole.target(), "/coffee");
    assert_eq!(whole.header("host"), Some("localhost:42069"));
    assert_eq!(whole.body, b"hello world!\n");

    for step in 1..=req.len() {
        let parsed = parse_in_steps(req, step).unwrap().into_request();
        assert_eq!(parsed.as_ref(), Some(&whole), "step {}", step);
    }
}

#[test]
fn test_parse_chunked_body_independent_of_chunk_size() {
    let req = b"POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nab\r\n1\r\nc\r\n0\r\nX-Digest: abc\r\n\r\n";
    let whole = parse_whole(req).unwrap().unwrap();
    assert_eq!(whole.body, b"abc");
    assert_eq!(whole.trailers.get("x-digest"), Some("abc"));

    for step in 1..=req.len() {
        let parsed = parse_in_steps(req, step).unwrap().into_request();
        assert_eq!(parsed.as_ref(), Some(&whole), "step {}", step);
    }
}

#[test]
fn test_parse_chunk_line_at_limit_independent_of_chunk_size() {
    // 4 + 60 = 64 bytes, the longest chunk-size line accepted.
    let req = chunked_with_extension(60);
    let whole = parse_whole(&req).unwrap().unwrap();
    assert_eq!(whole.body, b"abc");

    for step in 1..=req.len() {
        let parsed = parse_in_steps(&req, step).unwrap().into_request();
        assert_eq!(parsed.as_ref(), Some(&whole), "step {}", step);
    }
}

#[test]
fn test_parse_long_chunk_line_rejected_at_any_chunk_size() {
    let req = chunked_with_extension(80);
    let whole = parse_whole(&req);
    assert!(matches!(whole, Err(ParseError::InvalidChunkSize(_))));

    for step in 1..=req.len() {
        let stepped = parse_in_steps(&req, step).map(RequestParser::into_request);
        assert_eq!(stepped, whole, "step {}", step);
    }
}

#[test]
fn test_parse_returns_zero_until_line_complete() {
    let mut parser = RequestParser::new();

    assert_eq!(parser.parse(b"GET / HTT").unwrap(), 0);
    assert_eq!(parser.state(), ParseState::Init);

    assert_eq!(parser.parse(b"GET / HTTP/1.1\r\nHo").unwrap(), 16);
    assert_eq!(parser.state(), ParseState::Headers);
}

#[test]
fn test_parse_body_shorter_than_declared_is_not_done() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nabc";
    let consumed = parser.parse(req).unwrap();

    assert_eq!(consumed, req.len());
    assert_eq!(parser.state(), ParseState::Body);
    assert!(parser.into_request().is_none());
}

#[test]
fn test_parse_body_exact_length() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nabcde";

    assert_eq!(parser.parse(req).unwrap(), req.len());
    assert!(parser.is_done());
    assert_eq!(parser.body(), b"abcde");
}

#[test]
fn test_parse_body_extra_bytes_left_unconsumed() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nabcdef";

    assert_eq!(parser.parse(req).unwrap(), req.len() - 1);
    assert!(parser.is_done());
    assert_eq!(parser.body(), b"abcde");
}

#[test]
fn test_parse_zero_content_length() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n";

    assert_eq!(parser.parse(req).unwrap(), req.len());
    assert!(parser.is_done());
    assert!(parser.body().is_empty());
}

#[test]
fn test_parse_no_framing_means_empty_body() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nHost: x\r\n\r\nignored";

    assert_eq!(parser.parse(req).unwrap(), req.len() - 7);
    assert!(parser.is_done());
    assert!(parser.body().is_empty());
}

#[test]
fn test_parse_chunked_with_extensions_and_trailers() {
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
4;name=value\r\nWiki\r\n\
5\r\npedia\r\n\
0\r\nX-Checksum: ABC\r\nX-Count: 2\r\n\r\n";
    let mut parser = RequestParser::new();

    assert_eq!(parser.parse(req).unwrap(), req.len());
    let parsed = parser.into_request().unwrap();
    assert!(parsed.is_chunked());
    assert_eq!(parsed.body, b"Wikipedia");
    assert_eq!(parsed.trailers.get("x-checksum"), Some("abc"));
    assert_eq!(parsed.trailers.get("x-count"), Some("2"));
    assert!(parsed.header("x-checksum").is_none());
}

#[test]
fn test_parse_chunk_missing_crlf_after_data() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nabXX";

    assert_eq!(parser.parse(req), Err(ParseError::MalformedChunk));
}

#[test]
fn test_parse_invalid_chunk_size() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nxyz\r\n";

    assert!(matches!(parser.parse(req), Err(ParseError::InvalidChunkSize(_))));
}

#[test]
fn test_parse_unsupported_transfer_encoding() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n";

    assert!(matches!(
        parser.parse(req),
        Err(ParseError::UnsupportedTransferEncoding(_))
    ));
}

#[test]
fn test_parse_ambiguous_framing() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n";

    assert_eq!(parser.parse(req), Err(ParseError::AmbiguousFraming));
}

#[test]
fn test_parse_invalid_content_length() {
    let mut parser = RequestParser::new();
    let req = b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n";

    assert!(matches!(
        parser.parse(req),
        Err(ParseError::InvalidContentLength(_))
    ));
}

#[test]
fn test_parse_request_line_with_query_string() {
    let mut parser = RequestParser::new();
    parser
        .parse(b"GET /search?q=rust HTTP/1.1\r\n\r\n")
        .unwrap();

    assert_eq!(parser.into_request().unwrap().target(), "/search?q=rust");
}

#[test]
fn test_parse_extension_method() {
    let mut parser = RequestParser::new();
    parser.parse(b"PURGE /cache HTTP/1.1\r\n\r\n").unwrap();

    let parsed = parser.into_request().unwrap();
    assert_eq!(parsed.method(), &Method::Extension("PURGE".to_string()));
}

#[test]
fn test_parse_lowercase_method_rejected() {
    let mut parser = RequestParser::new();
    let result = parser.parse(b"get / HTTP/1.1\r\n\r\n");

    assert!(matches!(result, Err(ParseError::InvalidMethod(_))));
}

#[test]
fn test_parse_wrong_version_rejected() {
    for line in [
        &b"GET / HTTP/1.0\r\n\r\n"[..],
        &b"GET / HTTP/2.0\r\n\r\n"[..],
    ] {
        let mut parser = RequestParser::new();
        assert!(matches!(
            parser.parse(line),
            Err(ParseError::UnsupportedVersion(_))
        ));
    }

    let mut parser = RequestParser::new();
    assert!(matches!(
        parser.parse(b"GET / XTTP/1.1\r\n\r\n"),
        Err(ParseError::MalformedRequestLine(_))
    ));
}

#[test]
fn test_parse_request_line_out_of_order() {
    let mut parser = RequestParser::new();
    let result = parser.parse(b"/coffee POST HTTP/1.1\r\n\r\n");

    assert!(matches!(result, Err(ParseError::InvalidMethod(_))));
}

#[test]
fn test_parse_header_errors_propagate() {
    let mut parser = RequestParser::new();
    let result = parser.parse(b"GET / HTTP/1.1\r\n       Host : localhost:42069       \r\n\r\n");

    assert!(matches!(
        result,
        Err(ParseError::Header(HeaderError::InvalidName(_)))
    ));

    let mut parser = RequestParser::new();
    let result = parser.parse(b"GET / HTTP/1.1\r\nHost: a\r\nHost: b\r\n\r\n");
    assert_eq!(result, Err(ParseError::Header(HeaderError::DuplicateHost)));
}

#[test]
fn test_parse_duplicate_host_with_same_value() {
    let mut parser = RequestParser::new();
    let result = parser.parse(b"GET / HTTP/1.1\r\nHost: x\r\nHost: x\r\n\r\n");

    assert_eq!(result, Err(ParseError::Header(HeaderError::DuplicateHost)));
}

#[test]
fn test_parse_after_done() {
    let mut parser = RequestParser::new();
    parser.parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();

    assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n\r\n"), Err(ParseError::ParseAfterDone));
    assert_eq!(parser.parse(b""), Err(ParseError::ParseAfterDone));
}

#[test]
fn test_parse_header_limit() {
    let limits = Limits {
        max_header_bytes: 32,
        ..Limits::default()
    };

    let mut parser = RequestParser::with_limits(limits.clone());
    let result = parser.parse(b"GET / HTTP/1.1\r\nX-Long-Header-Name: some long value\r\n\r\n");
    assert!(matches!(result, Err(ParseError::HeadersTooLarge { limit: 32, .. })));

    // An unterminated line counts against the limit too.
    let mut parser = RequestParser::with_limits(limits);
    let result = parser.parse(&[b'A'; 64]);
    assert!(matches!(result, Err(ParseError::HeadersTooLarge { .. })));
}

#[test]
fn test_parse_body_limit() {
    let limits = Limits {
        max_body_bytes: 4,
        ..Limits::default()
    };

    let mut parser = RequestParser::with_limits(limits.clone());
    let result = parser.parse(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
    assert_eq!(result, Err(ParseError::BodyTooLarge { size: 5, limit: 4 }));

    let mut parser = RequestParser::with_limits(limits);
    let result = parser.parse(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n");
    assert_eq!(result, Err(ParseError::BodyTooLarge { size: 5, limit: 4 }));
}

#[test]
fn test_parse_error_messages() {
    assert_eq!(ParseError::ParseAfterDone.to_string(), "cannot parse beyond done");
    assert_eq!(
        ParseError::Header(HeaderError::DuplicateHost).to_string(),
        "bad request: duplicate host field"
    );
}
