//! Open-time parameters
//!
//! Backends ask for named parameters through a [`ParamResolver`], handing
//! it a typed destination. A resolver that does not know the name leaves
//! the destination untouched, so whatever the caller put there first is
//! the default.

/// Typed destination for one parameter
#[derive(Debug)]
pub enum ParamSlot<'a> {
    Int(&'a mut i64),
    Str(&'a mut String),
    Bool(&'a mut bool),
}

/// Source of open-time parameters
pub trait ParamResolver {
    /// Fill `slot` from the parameter `name`, if present and well formed
    fn resolve(&self, name: &str, slot: ParamSlot<'_>);

    fn int64(&self, name: &str, default: i64) -> i64 {
        let mut value = default;
        self.resolve(name, ParamSlot::Int(&mut value));
        value
    }

    fn string(&self, name: &str, default: &str) -> String {
        let mut value = default.to_string();
        self.resolve(name, ParamSlot::Str(&mut value));
        value
    }

    fn boolean(&self, name: &str, default: bool) -> bool {
        let mut value = default;
        self.resolve(name, ParamSlot::Bool(&mut value));
        value
    }
}

impl<F> ParamResolver for F
where
    F: Fn(&str, ParamSlot<'_>),
{
    fn resolve(&self, name: &str, slot: ParamSlot<'_>) {
        self(name, slot)
    }
}

/// Resolver with no parameters at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParams;

impl ParamResolver for NoParams {
    fn resolve(&self, _name: &str, _slot: ParamSlot<'_>) {}
}

/// Parameters parsed from a URI query string (`ctx=5&cache=off`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriParams {
    pairs: Vec<(String, String)>,
}

impl UriParams {
    /// Parse `k=v` pairs separated by `&`. A bare `k` has an empty value.
    /// Percent escapes are decoded in both names and values.
    pub fn parse(query: &str) -> Self {
        let pairs = query
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((k, v)) => (percent_decode(k), percent_decode(v)),
                None => (percent_decode(part), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// Split `name?query` into the file name and its parameters
    pub fn split_uri(uri: &str) -> (&str, Self) {
        match uri.split_once('?') {
            Some((name, query)) => (name, Self::parse(query)),
            None => (uri, Self::default()),
        }
    }

    /// Raw value of the first occurrence of `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl ParamResolver for UriParams {
    fn resolve(&self, name: &str, slot: ParamSlot<'_>) {
        let raw = match self.get(name) {
            Some(raw) => raw,
            None => return,
        };
        match slot {
            ParamSlot::Int(out) => {
                if let Ok(value) = raw.trim().parse::<i64>() {
                    *out = value;
                }
            }
            ParamSlot::Str(out) => *out = raw.to_string(),
            ParamSlot::Bool(out) => {
                if let Some(value) = parse_bool(raw) {
                    *out = value;
                }
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Decode `%HH` escapes; malformed escapes are kept literally
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
