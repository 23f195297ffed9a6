use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maps human player names to basketball-reference player ids.
///
/// The answer is parallel to the input: one list of candidate ids per name.
#[allow(async_fn_in_trait)]
pub trait PlayerIdResolver {
    async fn resolve(&self, names: &[String]) -> Result<Vec<Vec<String>>>;
}

/// Fixed name -> ids table. Deterministic, used offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPlayerIdResolver {
    ids: HashMap<String, Vec<String>>,
}

impl StaticPlayerIdResolver {
    pub fn new(ids: HashMap<String, Vec<String>>) -> Self {
        Self { ids }
    }

    /// Load a JSON object of `{"Player Name": ["id01", ...]}`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read player id file {}", path.display()))?;
        let ids = serde_json::from_str(&json).context("Failed to parse player id file")?;
        Ok(Self { ids })
    }

    pub fn get(&self, name: &str) -> Option<&Vec<String>> {
        self.ids.get(name)
    }
}

impl PlayerIdResolver for StaticPlayerIdResolver {
    async fn resolve(&self, names: &[String]) -> Result<Vec<Vec<String>>> {
        names
            .iter()
            .map(|name| {
                self.ids
                    .get(name)
                    .cloned()
                    .with_context(|| format!("No player id known for {}", name))
            })
            .collect()
    }
}

/// Answers from a JSON cache file first and asks `inner` only for names it
/// hasn't seen, writing new answers back to the file.
pub struct CachingPlayerIdResolver<R> {
    inner: R,
    cache_file: PathBuf,
}

impl<R: PlayerIdResolver> CachingPlayerIdResolver<R> {
    pub fn new(inner: R, cache_file: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cache_file: cache_file.into(),
        }
    }

    fn load_cache(&self) -> Result<HashMap<String, Vec<String>>> {
        if !self.cache_file.exists() {
            return Ok(HashMap::new());
        }
        let json = std::fs::read_to_string(&self.cache_file).context("Failed to read id cache")?;
        serde_json::from_str(&json).context("Failed to parse id cache")
    }

    fn save_cache(&self, cache: &HashMap<String, Vec<String>>) -> Result<()> {
        if let Some(parent) = self.cache_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(cache).context("Failed to serialize id cache")?;
        std::fs::write(&self.cache_file, json).context("Failed to write id cache")?;
        Ok(())
    }
}

impl<R: PlayerIdResolver> PlayerIdResolver for CachingPlayerIdResolver<R> {
    async fn resolve(&self, names: &[String]) -> Result<Vec<Vec<String>>> {
        let mut cache = self.load_cache()?;

        let misses: Vec<String> = names
            .iter()
            .filter(|n| !cache.contains_key(*n))
            .cloned()
            .collect();

        if !misses.is_empty() {
            info!("Resolving {} player ids not in cache", misses.len());
            let answers = self.inner.resolve(&misses).await?;
            if answers.len() != misses.len() {
                return Err(PipelineError::OracleLengthMismatch {
                    expected: misses.len(),
                    got: answers.len(),
                }
                .into());
            }
            cache.extend(misses.into_iter().zip(answers));
            self.save_cache(&cache)?;
        } else {
            debug!("All {} player ids served from cache", names.len());
        }

        names
            .iter()
            .map(|n| {
                cache
                    .get(n)
                    .cloned()
                    .with_context(|| format!("No player id known for {}", n))
            })
            .collect()
    }
}

/// Strictly parse a list literal such as `[['hardeja01'], ['zubaciv01']]`.
///
/// Elements may be quoted strings or lists of quoted strings; a bare string
/// becomes a one-id list. Markdown code fences around the literal are
/// tolerated, anything else is rejected.
pub fn parse_id_list_literal(text: &str) -> Result<Vec<Vec<String>>, PipelineError> {
    let body = strip_code_fence(text.trim());
    let mut parser = LiteralParser {
        chars: body.chars().collect(),
        pos: 0,
    };

    let items = parser.list()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("trailing characters after list"));
    }

    items
        .into_iter()
        .map(|item| match item {
            Literal::Str(id) => Ok(vec![id]),
            Literal::List(inner) => inner
                .into_iter()
                .map(|v| match v {
                    Literal::Str(id) => Ok(id),
                    Literal::List(_) => Err(PipelineError::MalformedOracleResponse(
                        "ids nested more than two levels deep".to_string(),
                    )),
                })
                .collect(),
        })
        .collect()
}

/// Parse a response and check it has one entry per requested name
pub fn parse_id_response(
    text: &str,
    expected: usize,
) -> Result<Vec<Vec<String>>, PipelineError> {
    let ids = parse_id_list_literal(text)?;
    if ids.len() != expected {
        return Err(PipelineError::OracleLengthMismatch {
            expected,
            got: ids.len(),
        });
    }
    Ok(ids)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag on the opening fence
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

enum Literal {
    Str(String),
    List(Vec<Literal>),
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn error(&self, msg: &str) -> PipelineError {
        PipelineError::MalformedOracleResponse(format!("{} at offset {}", msg, self.pos))
    }

    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn expect(&mut self, c: char) -> Result<(), PipelineError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn list(&mut self) -> Result<Vec<Literal>, PipelineError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => {
                    items.push(self.value()?);
                    match self.peek() {
                        Some(',') => self.pos += 1,
                        Some(']') => {}
                        _ => return Err(self.error("expected ',' or ']'")),
                    }
                }
                None => return Err(self.error("unterminated list")),
            }
        }
    }

    fn value(&mut self) -> Result<Literal, PipelineError> {
        match self.peek() {
            Some('[') => Ok(Literal::List(self.list()?)),
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                let mut s = String::new();
                loop {
                    match self.chars.get(self.pos).copied() {
                        Some('\\') => {
                            let escaped = self
                                .chars
                                .get(self.pos + 1)
                                .copied()
                                .ok_or_else(|| self.error("dangling escape"))?;
                            s.push(escaped);
                            self.pos += 2;
                        }
                        Some(c) if c == q => {
                            self.pos += 1;
                            return Ok(Literal::Str(s));
                        }
                        Some(c) => {
                            s.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => Err(self.error("expected a quoted id or a list")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_parse_nested_list() {
        let ids = parse_id_list_literal("[['hardeja01'], [\"zubaciv01\", 'zubaciv02']]").unwrap();
        assert_eq!(
            ids,
            vec![
                vec!["hardeja01".to_string()],
                vec!["zubaciv01".to_string(), "zubaciv02".to_string()]
            ]
        );
    }

    #[test]
    fn test_parse_flat_list_and_code_fence() {
        let ids = parse_id_list_literal("```python\n['curryst01', 'hardeja01']\n```").unwrap();
        assert_eq!(ids, vec![vec!["curryst01".to_string()], vec!["hardeja01".to_string()]]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "Here are the ids: ['curryst01']",
            "['curryst01'",
            "['curryst01' 'hardeja01']",
            "[curryst01]",
            "[['a', ['b']]]",
            "['curryst01'] and more",
        ] {
            assert!(
                matches!(
                    parse_id_list_literal(text),
                    Err(PipelineError::MalformedOracleResponse(_))
                ),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_parse_id_response_checks_length() {
        assert!(matches!(
            parse_id_response("[['a'], ['b']]", 3),
            Err(PipelineError::OracleLengthMismatch { expected: 3, got: 2 })
        ));
        assert!(parse_id_response("[]", 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticPlayerIdResolver::new(HashMap::from([(
            "Stephen Curry".to_string(),
            vec!["curryst01".to_string()],
        )]));
        let ids = resolver.resolve(&names(&["Stephen Curry"])).await.unwrap();
        assert_eq!(ids, vec![vec!["curryst01".to_string()]]);
        assert!(resolver.resolve(&names(&["Nobody"])).await.is_err());
    }

    #[tokio::test]
    async fn test_caching_resolver_writes_through() {
        let cache_file = std::env::temp_dir().join(format!(
            "nba_points_predictor_ids_{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&cache_file);

        let inner = StaticPlayerIdResolver::new(HashMap::from([(
            "James Harden".to_string(),
            vec!["hardeja01".to_string()],
        )]));
        let resolver = CachingPlayerIdResolver::new(inner, &cache_file);
        let ids = resolver.resolve(&names(&["James Harden"])).await.unwrap();
        assert_eq!(ids, vec![vec!["hardeja01".to_string()]]);

        // A fresh resolver with an empty inner table is served from the file
        let cached = CachingPlayerIdResolver::new(StaticPlayerIdResolver::default(), &cache_file);
        let ids = cached.resolve(&names(&["James Harden"])).await.unwrap();
        assert_eq!(ids, vec![vec!["hardeja01".to_string()]]);

        std::fs::remove_file(&cache_file).unwrap();
    }
}
