//! Stray fence removal for generated HTML.
//!
//! Language models sometimes wrap HTML in Markdown code fences (` ``` ` or
//! `'''`, optionally followed by a language tag) or leave such tokens between
//! elements. [`sanitize`] removes them from ordinary markup while leaving
//! `<script>`, `<style>` and `<pre>` blocks byte-for-byte intact.
//!
//! The input is split into [`Segment`]s once, by a linear scanner. Only
//! [`Segment::Text`] segments are rewritten, and a fence is kept whenever
//! deleting it would glue the surrounding text into a new `<pre`, `</style>`
//! or similar tag. Sanitized output therefore splits into exactly the same
//! protected blocks as its input.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// Elements whose contents are passed through verbatim.
const PROTECTED_TAGS: [&str; 3] = ["script", "style", "pre"];

/// Length of `</script`, the longest tag text that can precede a splice point.
const LONGEST_TAG_PREFIX: usize = 8;

/// A fence token plus an optional language tag (`html`, `c++`, ...).
const FENCE: &str = r"(?:```|''')(?:[A-Za-z][A-Za-z0-9_+#-]*)?";

/// A contiguous slice of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A complete `<script>`, `<style>` or `<pre>` element, tags included.
    Protected(&'a str),
    /// Everything else.
    Text(&'a str),
}

impl<'a> Segment<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Protected(s) | Segment::Text(s) => *s,
        }
    }
}

struct FenceRules {
    leading: Regex,
    trailing: Regex,
    own_line: Regex,
    bare: Regex,
}

fn rules() -> &'static FenceRules {
    static RULES: OnceLock<FenceRules> = OnceLock::new();
    RULES.get_or_init(|| {
        let compile = |pattern: String| Regex::new(&pattern).expect("fence pattern");
        FenceRules {
            leading: compile(format!(r"\A\s*{FENCE}\s*")),
            trailing: compile(r"\s*(?:```|''')\s*\z".to_string()),
            own_line: compile(format!(r"(?m)^[ \t]*{FENCE}[ \t]*(\r?)$")),
            bare: compile(FENCE.to_string()),
        }
    })
}

/// Returns true if `text` contains a fence token anywhere.
pub fn contains_fence(text: &str) -> bool {
    text.contains("```") || text.contains("'''")
}

/// Remove stray fence tokens from `html`.
///
/// Never fails. Input without fence tokens is returned unchanged, protected
/// blocks come out exactly as they went in, and the result is a fixed point:
/// `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(html: &str) -> String {
    if !contains_fence(html) {
        return html.to_string();
    }

    let rules = rules();
    let parts = segments(html);
    let last = parts.len().saturating_sub(1);
    let mut out = String::with_capacity(html.len());
    for (i, segment) in parts.into_iter().enumerate() {
        match segment {
            Segment::Protected(block) => out.push_str(block),
            Segment::Text(text) => out.push_str(&clean_text(text, i == 0, i == last, rules)),
        }
    }
    out
}

/// Strip fences from one text segment. `first` and `last` say whether it sits
/// at the start or end of the document, where wrapping fences are trimmed.
fn clean_text(text: &str, first: bool, last: bool, rules: &FenceRules) -> String {
    let mut current = text.to_string();
    // A removal can splice two fragments into a new fence (e.g. "``'''`"),
    // so repeat until nothing changes. Each productive pass shrinks the text.
    loop {
        if !contains_fence(&current) {
            return current;
        }
        let next = clean_once(&current, first, last, rules);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str, first: bool, last: bool, rules: &FenceRules) -> String {
    let mut text = text.to_string();
    if first {
        text = rules.leading.replace(&text, "").into_owned();
    }
    if last {
        text = rules.trailing.replace(&text, "").into_owned();
    }

    // A fence alone on its line goes with its indentation; a CR stays.
    let own_line = rules.own_line.captures_iter(&text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let end = caps.get(1).map_or(whole.end(), |cr| cr.start());
        Some(whole.start()..end)
    });
    let text = remove_spans(&text, own_line);

    let bare = rules.bare.find_iter(&text).map(|m| m.range());
    remove_spans(&text, bare)
}

/// Delete the given ascending, disjoint byte ranges from `text`, except
/// those whose removal would splice a protected tag together.
fn remove_spans(text: &str, spans: impl Iterator<Item = Range<usize>>) -> String {
    let mut out = Splicer::with_capacity(text.len());
    let mut copied = 0;
    for span in spans {
        out.push(&text[copied..span.start]);
        if out.would_join_tag(&text[span.end..]) {
            out.push(&text[span.clone()]);
        }
        copied = span.end;
    }
    out.push(&text[copied..]);
    out.buf
}

/// Output buffer that remembers where its trailing whitespace starts.
struct Splicer {
    buf: String,
    ws_start: usize,
}

impl Splicer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            ws_start: 0,
        }
    }

    fn push(&mut self, s: &str) {
        let solid = s.trim_end_matches(|c: char| c.is_ascii_whitespace());
        if !solid.is_empty() {
            self.ws_start = self.buf.len() + solid.len();
        }
        self.buf.push_str(s);
    }

    /// True if appending `rest` would complete a protected opening or
    /// closing tag that reaches back into what is already buffered.
    fn would_join_tag(&self, rest: &str) -> bool {
        let bytes = self.buf.as_bytes();
        let solid = &bytes[self.ws_start.saturating_sub(LONGEST_TAG_PREFIX)..self.ws_start];
        let gap = bytes.len() - self.ws_start;
        solid
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == b'<')
            .any(|(at, _)| {
                let joined = Joined {
                    left: &solid[at..],
                    gap,
                    right: rest.as_bytes(),
                };
                joined.tag_end().is_some_and(|end| end > joined.seam())
            })
    }
}

/// `left`, then `gap` bytes of whitespace, then `right`, read as one string.
struct Joined<'a> {
    left: &'a [u8],
    gap: usize,
    right: &'a [u8],
}

impl Joined<'_> {
    fn seam(&self) -> usize {
        self.left.len() + self.gap
    }

    fn get(&self, i: usize) -> Option<u8> {
        if i < self.left.len() {
            Some(self.left[i])
        } else if i < self.seam() {
            Some(b' ')
        } else {
            self.right.get(i - self.seam()).copied()
        }
    }

    /// End of the protected opening or closing tag that starts at index 0.
    fn tag_end(&self) -> Option<usize> {
        let closing = self.get(1) == Some(b'/');
        let name_at = if closing { 2 } else { 1 };
        let tag = PROTECTED_TAGS.iter().find(|tag| {
            tag.bytes()
                .enumerate()
                .all(|(k, t)| self.get(name_at + k).is_some_and(|b| b.eq_ignore_ascii_case(&t)))
        })?;
        let mut i = name_at + tag.len();
        if !closing {
            return self.get(i).filter(|&b| is_name_terminator(b)).map(|_| i + 1);
        }
        loop {
            if i >= self.left.len() && i < self.seam() {
                i = self.seam();
            }
            match self.get(i) {
                Some(b'>') => return Some(i + 1),
                Some(b) if b.is_ascii_whitespace() => i += 1,
                _ => return None,
            }
        }
    }
}

/// Split `html` into protected blocks and the text between them.
///
/// Tag names match case-insensitively. An opening tag without a matching
/// closing tag does not start a block; scanning resumes right after it.
/// Concatenating the segments reproduces the input exactly. Closing tags
/// are indexed once up front, so each opening tag costs a binary search.
pub fn segments(html: &str) -> Vec<Segment<'_>> {
    let bytes = html.as_bytes();
    let closers = Closers::scan(bytes);
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'<') {
        let open = pos + offset;
        match protected_block_end(bytes, open, &closers) {
            Some(end) => {
                if open > text_start {
                    out.push(Segment::Text(&html[text_start..open]));
                }
                out.push(Segment::Protected(&html[open..end]));
                text_start = end;
                pos = end;
            }
            None => pos = open + 1,
        }
    }

    if text_start < html.len() {
        out.push(Segment::Text(&html[text_start..]));
    }
    out
}

/// Every well-formed `</tag ... >` in a document, per protected tag, as
/// ascending `(start, end)` pairs.
struct Closers([Vec<(usize, usize)>; PROTECTED_TAGS.len()]);

impl Closers {
    fn scan(bytes: &[u8]) -> Self {
        let mut found: [Vec<(usize, usize)>; PROTECTED_TAGS.len()] = Default::default();
        for start in (0..bytes.len()).filter(|&i| bytes[i] == b'<') {
            if bytes.get(start + 1) != Some(&b'/') {
                continue;
            }
            let Some(index) = tag_at(bytes, start + 2) else {
                continue;
            };
            let mut i = start + 2 + PROTECTED_TAGS[index].len();
            while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                i += 1;
            }
            if bytes.get(i) == Some(&b'>') {
                found[index].push((start, i + 1));
            }
        }
        Closers(found)
    }

    /// End of the first closing tag for `PROTECTED_TAGS[index]` at or after `from`.
    fn first_end_from(&self, index: usize, from: usize) -> Option<usize> {
        let list = &self.0[index];
        let at = list.partition_point(|&(start, _)| start < from);
        list.get(at).map(|&(_, end)| end)
    }
}

/// Index of the protected tag whose name starts at `at`, if any.
fn tag_at(bytes: &[u8], at: usize) -> Option<usize> {
    PROTECTED_TAGS.iter().position(|tag| {
        bytes
            .get(at..at + tag.len())
            .is_some_and(|name| name.eq_ignore_ascii_case(tag.as_bytes()))
    })
}

/// If a protected element opens at `open` (which holds `<`), return the
/// index just past its closing tag.
fn protected_block_end(bytes: &[u8], open: usize, closers: &Closers) -> Option<usize> {
    let index = tag_at(bytes, open + 1)?;
    let name_end = open + 1 + PROTECTED_TAGS[index].len();
    if !bytes.get(name_end).is_some_and(|&b| is_name_terminator(b)) {
        return None;
    }
    closers.first_end_from(index, name_end)
}

fn is_name_terminator(b: u8) -> bool {
    b == b'>' || b == b'/' || b.is_ascii_whitespace()
}
