use fleetreport::export::simple_html;
use fleetreport::markdown::{Block, parse};
use fleetreport::render::{Profile, render, to_html};
use proptest::prelude::*;

fn code_line() -> impl Strategy<Value = String> {
    // Anything except a line that would close the fence.
    "[ a-z0-9#*_>|(){};=<&'\"-]{0,40}".prop_filter("closes fence", |line| {
        !line.trim_start().starts_with("```")
    })
}

proptest! {
    #[test]
    fn parse_never_panics(source in any::<String>()) {
        let _ = parse(&source);
    }

    #[test]
    fn parse_never_panics_on_markdown_like_lines(
        lines in prop::collection::vec("[#>*|`!\\[\\]()0-9. a-z_-]{0,24}", 0..20)
    ) {
        let source = lines.join("\n");
        let blocks = parse(&source);
        let _ = to_html(&render(blocks, Profile::Print));
        let _ = simple_html(&source);
    }

    #[test]
    fn code_block_keeps_raw_text(body in prop::collection::vec(code_line(), 0..8)) {
        let raw = body.join("\n");
        let source = format!("```rust\n{raw}\n```\n");
        let blocks = parse(&source);
        prop_assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::CodeBlock { language, raw_text } => {
                prop_assert_eq!(language.as_deref(), Some("rust"));
                prop_assert_eq!(raw_text, &raw);
            }
            other => prop_assert!(false, "expected code block, got {:?}", other),
        }
    }

    #[test]
    fn html_never_contains_raw_markup_from_source(text in "[a-z <>/\"']{0,40}") {
        let source = format!("{text}\n\n<script>{text}</script>");
        let html = to_html(&render(parse(&source), Profile::Interactive));
        prop_assert!(!html.contains("<script"));
        prop_assert!(!simple_html(&source).contains("<script"));
    }
}
