use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_TOKENS: usize = 80_000;
pub const DEFAULT_KEEP_FIRST: usize = 2;
pub const DEFAULT_KEEP_LAST: usize = 10;
pub const DEFAULT_CHUNK_SIZE: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionOptions {
    pub target_tokens: usize,
    pub keep_first_n: usize,
    pub keep_last_n: usize,
    pub chunk_size: usize,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            target_tokens: DEFAULT_TARGET_TOKENS,
            keep_first_n: DEFAULT_KEEP_FIRST,
            keep_last_n: DEFAULT_KEEP_LAST,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CompressionOptions {
    pub fn with_target_tokens(mut self, tokens: usize) -> Self {
        self.target_tokens = tokens;
        self
    }

    pub fn with_keep_first(mut self, count: usize) -> Self {
        self.keep_first_n = count;
        self
    }

    pub fn with_keep_last(mut self, count: usize) -> Self {
        self.keep_last_n = count;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompressionOptions::default();
        assert_eq!(
            (
                options.target_tokens,
                options.keep_first_n,
                options.keep_last_n,
                options.chunk_size
            ),
            (80_000, 2, 10, 5)
        );
    }

    #[test]
    fn test_chunk_size_never_zero() {
        assert_eq!(CompressionOptions::default().with_chunk_size(0).chunk_size, 1);
    }

    #[test]
    fn test_partial_deserialize() {
        let options: CompressionOptions =
            serde_json::from_str(r#"{"targetTokens": 1000, "keepLastN": 3}"#).unwrap();
        assert_eq!(options.target_tokens, 1000);
        assert_eq!(options.keep_last_n, 3);
        assert_eq!(options.keep_first_n, DEFAULT_KEEP_FIRST);
    }
}
