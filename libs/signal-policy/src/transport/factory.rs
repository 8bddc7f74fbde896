//! Transport selection
//!
//! Selectors name a built-in transport: `stdio` or `replay:<path>`. The
//! selector is resolved once at startup. `MemoryTransport` has no selector;
//! embedders and tests construct it directly.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::line::{ReplayTransport, StdioTransport};
use super::traits::{Transport, TransportError};

/// Selector used when none is configured
pub const DEFAULT_TRANSPORT: &str = "stdio";

/// Supported transport types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Lines over stdin/stdout
    Stdio,
    /// Inbound lines from a file, outbound to stdout
    Replay(PathBuf),
}

impl TransportKind {
    /// Selector names accepted by [`FromStr`](std::str::FromStr)
    pub fn supported() -> &'static [&'static str] {
        &["stdio", "replay:<path>"]
    }

    /// Create the transport this kind names
    pub fn build(&self) -> Result<Arc<dyn Transport>, TransportError> {
        let transport: Arc<dyn Transport> = match self {
            TransportKind::Stdio => Arc::new(StdioTransport::stdio()?),
            TransportKind::Replay(path) => Arc::new(ReplayTransport::replay(path)?),
        };
        Ok(transport)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Replay(path) => write!(f, "replay:{}", path.display()),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let selector = s.trim();
        if let Some((kind, path)) = selector.split_once(':') {
            if kind.eq_ignore_ascii_case("replay") {
                let path = path.trim();
                if path.is_empty() {
                    return Err(TransportError::LoadFailed(
                        "replay transport requires a path: replay:<path>".to_string(),
                    ));
                }
                return Ok(TransportKind::Replay(PathBuf::from(path)));
            }
        }

        match selector.to_lowercase().as_str() {
            "" | "stdio" | "stdin" => Ok(TransportKind::Stdio),
            _ => Err(TransportError::LoadFailed(format!(
                "Unknown transport '{}' (supported: {})",
                s,
                TransportKind::supported().join(", ")
            ))),
        }
    }
}

/// Resolve a selector and create its transport
pub fn create_transport(selector: &str) -> Result<Arc<dyn Transport>, TransportError> {
    let kind: TransportKind = selector.parse()?;
    debug!("Creating transport of type: {}", kind);
    let transport = kind.build()?;
    info!("Using {} transport", transport.name());
    Ok(transport)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_selector_parsing() {
        assert_eq!("stdio".parse::<TransportKind>().unwrap(), TransportKind::Stdio);
        assert_eq!("".parse::<TransportKind>().unwrap(), TransportKind::Stdio);
        assert_eq!("STDIO".parse::<TransportKind>().unwrap(), TransportKind::Stdio);
        assert_eq!(
            "replay:/tmp/in.txt".parse::<TransportKind>().unwrap(),
            TransportKind::Replay(PathBuf::from("/tmp/in.txt"))
        );
    }

    #[test]
    fn test_unknown_selector_is_load_error() {
        for selector in ["can", "memory", "replay:", "tcp:1.2.3.4"] {
            match selector.parse::<TransportKind>() {
                Err(TransportError::LoadFailed(_)) => {},
                other => panic!("Expected load failure for {}, got {:?}", selector, other),
            }
        }
    }

    #[test]
    fn test_display_round_trips() {
        for kind in [
            TransportKind::Stdio,
            TransportKind::Replay(PathBuf::from("signals.txt")),
        ] {
            assert_eq!(kind.to_string().parse::<TransportKind>().unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn test_create_replay_transport() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a=1").unwrap();
        let selector = format!("replay:{}", file.path().display());

        let transport = create_transport(&selector).unwrap();
        assert!(transport.name().starts_with("replay:"));
        assert!(create_transport("replay:/nonexistent/file").is_err());
    }
}
