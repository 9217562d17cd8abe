//! Unified error type for GLM parsing, serialization and tree manipulation
//!
//! Parse failures are fatal: the parser never hands back a partial tree, it
//! stops at the first structural problem and reports the source line it was
//! looking at. Serialization failures are reported per leaf so callers can
//! fall back to [`crate::writer::write_lenient`] when they prefer to skip
//! the offending block.
//!
//! # Example
//!
//! ```ignore
//! use glm_core::{GlmResult, GlmTree};
//!
//! fn reformat(text: &str) -> GlmResult<String> {
//!     let tree = GlmTree::parse(text)?;
//!     glm_core::writer::write(&tree)
//! }
//! ```

use thiserror::Error;

use crate::tree::LeafId;

/// Unified error type for all GLM operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlmError {
    /// A `}` arrived while no block was open
    #[error("Parse error at line {line}: unexpected '}}' with no open block")]
    UnexpectedCloseBrace { line: usize },

    /// Input ended with one or more blocks still open
    #[error("Parse error: block '{header}' opened at line {line} is never closed")]
    UnclosedBlock { header: String, line: usize },

    /// Input ended in the middle of a statement (no `;`, `{` or `}` after it)
    #[error("Parse error at line {line}: statement '{statement}' is not terminated")]
    UnterminatedStatement { statement: String, line: usize },

    /// A leaf has no block type the writer knows how to emit
    #[error("Cannot serialize leaf {id}: unrecognized block type ({description})")]
    UnrecognizedBlock { id: LeafId, description: String },

    /// A tree operation needed an attribute that the leaf does not carry
    #[error("Leaf {id} is missing required attribute '{key}'")]
    MissingAttribute { id: LeafId, key: String },

    /// Caller supplied an argument outside the accepted set
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results using GlmError.
pub type GlmResult<T> = Result<T, GlmError>;

impl GlmError {
    /// True for errors raised while turning text into a tree.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            GlmError::UnexpectedCloseBrace { .. }
                | GlmError::UnclosedBlock { .. }
                | GlmError::UnterminatedStatement { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GlmError::UnclosedBlock {
            header: "object house".into(),
            line: 3,
        };
        assert!(err.to_string().contains("object house"));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_close_brace_message_escapes_brace() {
        let err = GlmError::UnexpectedCloseBrace { line: 7 };
        assert_eq!(
            err.to_string(),
            "Parse error at line 7: unexpected '}' with no open block"
        );
    }

    #[test]
    fn test_parse_error_classification() {
        assert!(GlmError::UnexpectedCloseBrace { line: 1 }.is_parse_error());
        assert!(!GlmError::InvalidArgument("units".into()).is_parse_error());
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> GlmResult<()> {
            Err(GlmError::InvalidArgument("test".into()))
        }

        fn outer() -> GlmResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
