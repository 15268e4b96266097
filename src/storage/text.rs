//! # Text Format
//!
//! Line-based, whitespace-tokenized serialization of the structural tree.
//! Human-inspectable and portable; the float formatting is Rust's shortest
//! round-trip `Display`, so re-reading reproduces the exact bits written.
//!
//! ## Grammar
//!
//! ```text
//! <node_count> \t <leaf_count> \t <item_count>
//! <body>
//!
//! body of a node:   N \t <axis> \t <split>     then low, high, mid bodies
//! body of a leaf:   L \t <count>               then <count> id lines
//! ```
//!
//! The body is pre-order; reading rebuilds the arena in post-order (children
//! are completed before their parent is appended), so a text-loaded tree
//! has the same record layout as a freshly built one and can be written
//! straight to the binary format.
//!
//! ## Reader Robustness
//!
//! The reader is a stack machine, not a recursive-descent parser: a
//! maliciously deep file costs heap, never call stack. Every token is
//! validated, every record is checked against the declared counts before it
//! is stored, and failures carry the 1-based line number in a typed
//! [`ParseError`].

use std::io::{BufRead, Write};

use eyre::{bail, Result, WrapErr};

use crate::tree::{Arena, ArenaStore};

/// A malformed text file. Fatal to the read.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line: usize,
    pub detail: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed tree text at line {}: {}", self.line, self.detail)
    }
}

impl std::error::Error for ParseError {}

/// Writes the counts line and the pre-order body of the tree rooted at `root`.
pub fn write_text<W: Write>(out: &mut W, store: &ArenaStore, root: i32) -> Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}",
        store.node_count(),
        store.leaf_count(),
        store.item_count()
    )
    .wrap_err("failed to write tree header")?;

    write_subtree(out, store, root).wrap_err("failed to write tree body")
}

fn write_subtree<W: Write>(out: &mut W, store: &ArenaStore, child_ref: i32) -> Result<()> {
    if child_ref >= 0 {
        let node = store.node(child_ref);
        writeln!(out, "N\t{}\t{}", node.axis, node.split)?;
        write_subtree(out, store, node.low)?;
        write_subtree(out, store, node.high)?;
        write_subtree(out, store, node.mid)?;
    } else {
        let leaf = store.leaf_at(crate::tree::leaf_index(child_ref));
        let count = (leaf.last_item - leaf.first_item + 1) as usize;
        writeln!(out, "L\t{}", count)?;
        for position in leaf.first_item..=leaf.last_item {
            writeln!(out, "{}", store.item(position))?;
        }
    }
    Ok(())
}

/// A node record whose children have not all been read yet.
struct PendingNode {
    axis: u32,
    split: f64,
    children: [i32; 3],
    filled: usize,
}

struct LineReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            None => Ok(None),
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line.wrap_err("failed to read tree text")?))
            }
        }
    }

    fn expect_line(&mut self) -> Result<String> {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => bail!(ParseError {
                line: self.line_no + 1,
                detail: "unexpected end of file".to_string(),
            }),
        }
    }
}

fn parse_error(line: usize, detail: impl Into<String>) -> eyre::Report {
    eyre::Report::new(ParseError {
        line,
        detail: detail.into(),
    })
}

fn take_token<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<T> {
    let Some(token) = tokens.next() else {
        return Err(parse_error(line, format!("missing {}", what)));
    };
    token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {} '{}'", what, token)))
}

fn expect_no_trailing<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<()> {
    if tokens.next().is_some() {
        return Err(parse_error(line, "trailing tokens on line"));
    }
    Ok(())
}

/// Reads a tree back from its text form.
///
/// `dims` is the dimensionality the caller is reloading into; axes outside
/// `[0, dims)` make the file malformed for this tree.
pub fn read_text<R: BufRead>(input: R, dims: usize) -> Result<(Arena, i32)> {
    let mut reader = LineReader::new(input);

    let header = reader.expect_line()?;
    let mut tokens = header.split_whitespace();
    let node_count: usize = take_token(&mut tokens, reader.line_no, "node count")?;
    let leaf_count: usize = take_token(&mut tokens, reader.line_no, "leaf count")?;
    let item_count: usize = take_token(&mut tokens, reader.line_no, "item count")?;
    expect_no_trailing(&mut tokens, reader.line_no)?;

    let mut arena = Arena::with_limits(node_count, leaf_count, item_count);
    let mut pending: Vec<PendingNode> = Vec::new();
    let mut nodes_read = 0usize;
    let mut ids = Vec::new();

    let root = loop {
        let line = reader.expect_line()?;
        let line_no = reader.line_no;
        let mut tokens = line.split_whitespace();

        let Some(head) = tokens.next() else {
            return Err(parse_error(line_no, "empty line in tree body"));
        };

        match head {
            "N" => {
                if nodes_read == node_count {
                    return Err(parse_error(line_no, "more nodes than declared"));
                }
                nodes_read += 1;

                let axis: u32 = take_token(&mut tokens, line_no, "axis")?;
                if axis as usize >= dims {
                    return Err(parse_error(
                        line_no,
                        format!("axis {} out of range for {} dimensions", axis, dims),
                    ));
                }

                let split: f64 = take_token(&mut tokens, line_no, "split coordinate")?;
                if split.is_nan() {
                    return Err(parse_error(line_no, "split coordinate is NaN"));
                }
                expect_no_trailing(&mut tokens, line_no)?;

                pending.push(PendingNode {
                    axis,
                    split,
                    children: [0; 3],
                    filled: 0,
                });
            }
            "L" => {
                if arena.leaf_count() == leaf_count {
                    return Err(parse_error(line_no, "more leaves than declared"));
                }

                let count: usize = take_token(&mut tokens, line_no, "leaf item count")?;
                expect_no_trailing(&mut tokens, line_no)?;

                if arena.item_count() + count > item_count {
                    return Err(parse_error(line_no, "more items than declared"));
                }

                ids.clear();
                for _ in 0..count {
                    let id_line = reader.expect_line()?;
                    let mut id_tokens = id_line.split_whitespace();
                    let id: i32 = take_token(&mut id_tokens, reader.line_no, "item id")?;
                    expect_no_trailing(&mut id_tokens, reader.line_no)?;
                    ids.push(id);
                }

                let leaf = arena.push_leaf(&ids)?;
                if let Some(root) = attach(&mut arena, &mut pending, leaf)? {
                    break root;
                }
            }
            other => {
                return Err(parse_error(
                    line_no,
                    format!("unknown record type '{}'", other),
                ));
            }
        }
    };

    if arena.node_count() != node_count
        || arena.leaf_count() != leaf_count
        || arena.item_count() != item_count
    {
        return Err(parse_error(
            reader.line_no,
            format!(
                "counts line declared {}/{}/{} records but body contained {}/{}/{}",
                node_count,
                leaf_count,
                item_count,
                arena.node_count(),
                arena.leaf_count(),
                arena.item_count()
            ),
        ));
    }

    while let Some(line) = reader.next_line()? {
        if !line.trim().is_empty() {
            return Err(parse_error(reader.line_no, "trailing content after tree"));
        }
    }

    Ok((arena, root))
}

/// Hands a completed subtree to its parent; completed parents cascade.
///
/// Returns the root reference once the outermost subtree closes.
fn attach(arena: &mut Arena, pending: &mut Vec<PendingNode>, completed: i32) -> Result<Option<i32>> {
    let mut carried = completed;

    loop {
        match pending.pop() {
            None => return Ok(Some(carried)),
            Some(mut node) => {
                node.children[node.filled] = carried;
                node.filled += 1;

                if node.filled < 3 {
                    pending.push(node);
                    return Ok(None);
                }

                // Body order is low, high, mid.
                let [low, high, mid] = node.children;
                carried = arena.push_node(node.axis, node.split, low, mid, high)?;
            }
        }
    }
}
