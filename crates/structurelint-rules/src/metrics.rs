use std::collections::HashMap;

use regex::Regex;

/// A single function/method's name and source text, as located by a
/// generic cross-language scan (brace-matching for C-like grammars,
/// indentation for Python). Best-effort: it does not parse a CST, so
/// nested or one-line function definitions may be missed.
pub struct FunctionSpan {
    pub name: String,
    pub body: String,
}

pub fn extract_functions(source: &str, ext: &str) -> Vec<FunctionSpan> {
    if ext == "py" {
        extract_python_functions(source)
    } else {
        extract_brace_functions(source)
    }
}

fn parse_def_name(line: &str) -> Option<String> {
    let rest = line.strip_prefix("def ").or_else(|| line.strip_prefix("async def "))?;
    let end = rest.find('(')?;
    Some(rest[..end].trim().to_string())
}

fn leading_indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn extract_python_functions(source: &str) -> Vec<FunctionSpan> {
    let lines: Vec<&str> = source.lines().collect();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim_start();
        let indent = leading_indent(lines[i]);
        if let Some(name) = parse_def_name(trimmed) {
            let mut body = String::new();
            let mut j = i + 1;
            while j < lines.len() {
                let next = lines[j];
                if next.trim().is_empty() {
                    body.push('\n');
                    j += 1;
                    continue;
                }
                if leading_indent(next) <= indent {
                    break;
                }
                body.push_str(next);
                body.push('\n');
                j += 1;
            }
            spans.push(FunctionSpan { name, body });
            i = j;
        } else {
            i += 1;
        }
    }
    spans
}

fn matching_brace(bytes: &[u8], open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(open_idx) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_brace_functions(source: &str) -> Vec<FunctionSpan> {
    let header_re = Regex::new(r"(?m)([A-Za-z_][A-Za-z0-9_]*)\s*\([^;{}]*\)\s*\{").unwrap();
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut search_from = 0usize;
    while let Some(m) = header_re.find_at(source, search_from) {
        let caps = header_re.captures(&source[m.start()..m.end()]);
        let name = caps.and_then(|c| c.get(1)).map(|g| g.as_str().to_string());
        let open_brace = m.end() - 1;
        match matching_brace(bytes, open_brace) {
            Some(close) => {
                if let Some(name) = name {
                    spans.push(FunctionSpan {
                        name,
                        body: source[open_brace + 1..close].to_string(),
                    });
                }
                search_from = close + 1;
            }
            None => search_from = m.end(),
        }
    }
    spans
}

const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "case", "catch"];

fn count_word(line: &str, word: &str) -> usize {
    line.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|tok| *tok == word)
        .count()
}

/// Best-effort, language-agnostic cognitive-complexity estimate: scans for
/// control-flow keywords and weights each by its nesting depth (brace depth
/// for C-like bodies, relative indentation for Python).
pub fn cognitive_complexity(body: &str, python_style: bool) -> u32 {
    let mut score = 0u32;
    let mut brace_depth: i32 = 0;
    let base_indent = body
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(leading_indent)
        .unwrap_or(0);
    for line in body.lines() {
        let nesting = if python_style {
            ((leading_indent(line).saturating_sub(base_indent)) / 4) as i32
        } else {
            brace_depth.max(0)
        };
        for kw in CONTROL_KEYWORDS {
            score += count_word(line, kw) as u32 * (1 + nesting.max(0) as u32);
        }
        score += line.matches("&&").count() as u32;
        score += line.matches("||").count() as u32;
        if !python_style {
            brace_depth += line.matches('{').count() as i32 - line.matches('}').count() as i32;
        }
    }
    score
}

/// Distinct/total operator and operand counts for a generic Halstead
/// computation, tokenized with a single cross-language regex (identifiers,
/// numeric/string literals, and punctuation/symbol runs).
pub struct Halstead {
    pub distinct_operators: usize,
    pub distinct_operands: usize,
    pub total_operators: usize,
    pub total_operands: usize,
}

impl Halstead {
    pub fn effort(&self) -> f64 {
        if self.distinct_operators == 0 || self.distinct_operands == 0 {
            return 0.0;
        }
        let volume = (self.total_operators + self.total_operands) as f64
            * ((self.distinct_operators + self.distinct_operands) as f64).log2();
        let difficulty =
            (self.distinct_operators as f64 / 2.0) * (self.total_operands as f64 / self.distinct_operands as f64);
        difficulty * volume
    }
}

const OPERATOR_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "case", "return", "break", "continue", "new", "delete", "throw", "catch",
    "try", "def", "class", "import", "from",
];

pub fn halstead(body: &str) -> Halstead {
    let token_re =
        Regex::new(r#"[A-Za-z_][A-Za-z0-9_]*|\d+(?:\.\d+)?|"[^"]*"|'[^']*'|[+\-*/%=<>!&|^~?:.,;(){}\[\]]+"#).unwrap();
    let mut operators: HashMap<String, usize> = HashMap::new();
    let mut operands: HashMap<String, usize> = HashMap::new();
    for m in token_re.find_iter(body) {
        let tok = m.as_str();
        let first = tok.chars().next().unwrap_or(' ');
        if first.is_alphabetic() || first == '_' {
            if OPERATOR_KEYWORDS.contains(&tok) {
                *operators.entry(tok.to_string()).or_insert(0) += 1;
            } else {
                *operands.entry(tok.to_string()).or_insert(0) += 1;
            }
        } else if first == '"' || first == '\'' || first.is_ascii_digit() {
            *operands.entry(tok.to_string()).or_insert(0) += 1;
        } else {
            *operators.entry(tok.to_string()).or_insert(0) += 1;
        }
    }
    Halstead {
        distinct_operators: operators.len(),
        distinct_operands: operands.len(),
        total_operators: operators.values().sum(),
        total_operands: operands.values().sum(),
    }
}
