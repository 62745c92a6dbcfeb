use spacecat::slack::command_parser::{
    ParsedArgs, decode_url_component, parse_form_data, strip_mentions, tokenize,
};

#[test]
fn test_decode_url_component() {
    // Test URL decoding with percent-encoded characters
    let encoded = "hello%20world";
    let decoded = decode_url_component(encoded).unwrap();
    assert_eq!(decoded, "hello world");

    // Test URL decoding with plus signs representing spaces
    let encoded_plus = "hello+world";
    let decoded_plus = decode_url_component(encoded_plus).unwrap();
    assert_eq!(decoded_plus, "hello world");

    // Test decoding with special characters
    let special_chars = "test%40example.com%26param%3Dvalue";
    let decoded_special = decode_url_component(special_chars).unwrap();
    assert_eq!(decoded_special, "test@example.com&param=value");
}

#[test]
fn test_parse_interactive_form_body() {
    // Interactive components arrive as a single `payload` field holding JSON
    let form_data = "payload=%7B%22type%22%3A%22block_actions%22%2C%22trigger_id%22%3A%2212.34%22%7D";

    let fields = parse_form_data(form_data).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&fields["payload"]).unwrap();

    assert_eq!(payload["type"], "block_actions");
    assert_eq!(payload["trigger_id"], "12.34");
}

#[test]
fn test_parse_form_data_keeps_last_value_and_tolerates_missing_values() {
    let fields = parse_form_data("a=1&b&a=2&&c=x+y").unwrap();

    assert_eq!(fields["a"], "2");
    assert_eq!(fields["b"], "");
    assert_eq!(fields["c"], "x y");
}

#[test]
fn test_parse_form_data_invalid_utf8() {
    assert!(parse_form_data("text=%FF%FE").is_err());
}

#[test]
fn test_strip_mentions() {
    assert_eq!(strip_mentions("<@U012AB3CD> get site a.com"), "get site a.com");
    assert_eq!(strip_mentions("<@U1|spacecat> <@U2> help"), "help");
    // Mentions in the middle of the text are kept
    assert_eq!(strip_mentions("help <@U1>"), "help <@U1>");
}

#[test]
fn test_tokenize_quotes_and_links() {
    let tokens = tokenize("add site <https://www.acme.com|www.acme.com> \u{201C}Acme Inc\u{201D} \"\"");
    assert_eq!(
        tokens,
        vec!["add", "site", "https://www.acme.com", "Acme Inc", ""]
    );

    let tokens = tokenize("invite <mailto:jane@acme.com|jane@acme.com>");
    assert_eq!(tokens, vec!["invite", "jane@acme.com"]);
}

#[test]
fn test_parsed_args_options() {
    let args = ParsedArgs::parse("https://a.com/?x=1 weeks=8 Region=EU");

    // URLs with a query string stay positional
    assert_eq!(args.get(0), Some("https://a.com/?x=1"));
    assert_eq!(args.get(1), None);
    assert_eq!(args.option("weeks"), Some("8"));
    assert_eq!(args.option("region"), Some("EU"));
}
