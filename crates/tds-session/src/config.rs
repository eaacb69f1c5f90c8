//! Session layer configuration.

/// Tunables of the message layer.
///
/// The defaults match the capture profile this decoder was built for;
/// there is no CLI or environment plumbing at this layer, embedders pass
/// a value in.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Reassembly cap per logical message, in bytes. A message growing
    /// past this is closed as a parse error and dropped until the next
    /// EOM.
    pub max_buffered: usize,
    /// Most result columns tracked per COLMETADATA. More is a parse
    /// error for the message.
    pub max_columns: usize,
    /// Byte capacity of the rendered SQL text (query, parameter list).
    pub sql_capacity: usize,
    /// Byte capacity of extracted names (user, database).
    pub name_capacity: usize,
    /// Byte capacity of extracted error messages.
    pub error_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_buffered: 30_000,
            max_columns: 100,
            sql_capacity: 8192,
            name_capacity: 256,
            error_capacity: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_capture_profile() {
        let config = SessionConfig::default();
        assert_eq!(config.max_buffered, 30_000);
        assert_eq!(config.max_columns, 100);
    }
}
