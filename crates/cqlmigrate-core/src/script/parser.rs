//! Line-oriented CQL statement splitter.

/// Statement delimiter.
const DELIMITER: char = ';';

/// Alternate quote used for function bodies.
const ALTERNATE_QUOTE: &str = "$$";

/// Accumulates lines until a statement is complete.
#[derive(Debug, Default)]
pub(crate) struct StatementBuilder {
    statement: String,
    empty: bool,
    terminated: bool,
    in_quote: bool,
    in_alternate_quote: bool,
    in_block_comment: bool,
    /// The line being processed ended inside a single-line comment.
    line_comment: bool,
    /// Something other than comments and whitespace has been seen.
    content_seen: bool,
}

impl StatementBuilder {
    pub(crate) fn new() -> Self {
        Self {
            empty: true,
            ..Default::default()
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.empty
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Nothing but comments so far, and no literal or comment left open.
    pub(crate) fn can_discard(&self) -> bool {
        !self.in_quote && !self.in_alternate_quote && !self.in_block_comment && !self.content_seen
    }

    pub(crate) fn into_statement(self) -> String {
        self.statement
    }

    pub(crate) fn add_line(&mut self, line: &str) {
        if self.empty {
            self.empty = false;
        } else {
            self.statement.push('\n');
        }
        self.statement.push_str(line);

        let ends_with_delimiter = self.scan(line);
        if ends_with_delimiter
            && !self.line_comment
            && !self.in_quote
            && !self.in_alternate_quote
            && !self.in_block_comment
        {
            strip_delimiter(&mut self.statement);
            self.terminated = true;
        }
    }

    /// Update literal/comment state for one line. Returns whether the line,
    /// ignoring trailing whitespace, ends with the delimiter outside any
    /// literal or comment.
    fn scan(&mut self, line: &str) -> bool {
        self.line_comment = false;
        let mut last_significant: Option<char> = None;
        let mut chars = line.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            let rest = &line[idx..];

            if self.in_block_comment {
                if rest.starts_with("*/") {
                    self.in_block_comment = false;
                    chars.next();
                }
                continue;
            }

            if self.in_alternate_quote {
                if rest.starts_with(ALTERNATE_QUOTE) {
                    self.in_alternate_quote = false;
                    chars.next();
                    last_significant = Some('$');
                }
                continue;
            }

            if self.in_quote {
                if c == '\'' {
                    // '' is an escaped quote inside the literal
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                    } else {
                        self.in_quote = false;
                        last_significant = Some('\'');
                    }
                }
                continue;
            }

            if rest.starts_with("--") || rest.starts_with("//") {
                self.line_comment = true;
                break;
            }
            if rest.starts_with("/*") {
                self.in_block_comment = true;
                chars.next();
                continue;
            }
            if rest.starts_with(ALTERNATE_QUOTE) {
                self.in_alternate_quote = true;
                self.content_seen = true;
                chars.next();
                continue;
            }
            if c == '\'' {
                self.in_quote = true;
                self.content_seen = true;
                continue;
            }
            if !c.is_whitespace() {
                self.content_seen = true;
                last_significant = Some(c);
            }
        }

        last_significant == Some(DELIMITER)
    }
}

/// Remove trailing whitespace and the final delimiter.
fn strip_delimiter(statement: &mut String) {
    let trimmed_len = statement.trim_end().len();
    statement.truncate(trimmed_len);
    if statement.ends_with(DELIMITER) {
        statement.pop();
    }
}

/// Split script text into statements.
pub(crate) fn split_statements(source: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut builder = StatementBuilder::new();

    for line in source.lines() {
        if builder.is_empty() && line.trim().is_empty() {
            continue;
        }

        builder.add_line(line);
        if builder.can_discard() {
            builder = StatementBuilder::new();
        } else if builder.is_terminated() {
            statements.push(std::mem::replace(&mut builder, StatementBuilder::new()).into_statement());
        }
    }

    if !builder.is_empty() {
        statements.push(builder.into_statement());
    }
    statements
}
