//! Pure string transforms on extraction lines and type names

/// Marker between an enclosing type and a nested one
pub const NESTING_MARKER: char = '$';

/// Strip an inner-type qualifier: `com.a.Outer$Inner` becomes `com.a.Outer`.
pub fn denest(name: &str, preserve_nested: bool) -> &str {
    if preserve_nested {
        return name;
    }
    match name.find(NESTING_MARKER) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Denest `name`, or `None` when no usable name is left. A marker that opens
/// a segment (`com.sun.proxy.$Proxy12`, `$1`) leaves nothing but a package.
pub fn denested_name(name: &str, preserve_nested: bool) -> Option<&str> {
    let name = denest(name, preserve_nested);
    if name.is_empty() || name.ends_with('.') {
        None
    } else {
        Some(name)
    }
}

/// A recognised extraction line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionLine<'a> {
    /// `<type name="X">` opens code unit `X`
    Type(&'a str),
    /// `<depends-on name="Y">` adds an edge from the open unit to `Y`
    DependsOn(&'a str),
}

/// Classify one line of the extraction file; anything else is `None`.
///
/// The name attribute is returned as written, possibly empty.
pub fn classify(line: &str) -> Option<ExtractionLine<'_>> {
    let line = line.trim_start();
    if let Some(rest) = element_body(line, "type") {
        return Some(ExtractionLine::Type(name_attribute(rest).unwrap_or("")));
    }
    if let Some(rest) = element_body(line, "depends-on") {
        return Some(ExtractionLine::DependsOn(name_attribute(rest).unwrap_or("")));
    }
    None
}

/// The text after `<tag` when the line opens that element
fn element_body<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix('<')?.strip_prefix(tag)?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '>' || c == '/' => Some(rest),
        _ => None,
    }
}

/// Value of the `name="..."` attribute
fn name_attribute(body: &str) -> Option<&str> {
    let mut rest = body;
    while let Some(idx) = rest.find("name=\"") {
        let preceded_by_space = idx == 0 || rest[..idx].ends_with(char::is_whitespace);
        let value = &rest[idx + "name=\"".len()..];
        if preceded_by_space {
            let end = value.find('"')?;
            return Some(value[..end].trim());
        }
        rest = value;
    }
    None
}
