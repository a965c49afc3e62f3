use tree_sitter::{Parser, Tree};

pub fn parse_python(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    parser.parse(source, None)
}

/// Whether `source` parses without syntax errors.
pub fn parses_cleanly(source: &str) -> bool {
    parse_python(source).is_some_and(|tree| !tree.root_node().has_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_cleanly() {
        assert!(parses_cleanly("def f():\n    return 1\n"));
        assert!(parses_cleanly(""));
        assert!(!parses_cleanly("def f():\n        debug()\n    return 1\n"));
        assert!(!parses_cleanly("else:\n    y = 2\n"));
    }
}
