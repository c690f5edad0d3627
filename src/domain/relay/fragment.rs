//! Fragment value object: one incremental piece of streamed answer text.

/// A unit of streamed output.
///
/// Fragments are ephemeral. They are forwarded to the caller and folded into
/// the accumulated answer, never stored on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Incremental text. Empty only on the final marker fragment.
    pub text: String,
    /// True when the upstream signalled normal end of stream.
    pub is_final: bool,
}

impl Fragment {
    /// Creates a text-bearing fragment.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    /// Creates the end-of-stream marker.
    pub fn end() -> Self {
        Self {
            text: String::new(),
            is_final: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_not_final() {
        let fragment = Fragment::delta("Hel");
        assert_eq!(fragment.text, "Hel");
        assert!(!fragment.is_final);
    }

    #[test]
    fn end_is_final_and_empty() {
        let fragment = Fragment::end();
        assert!(fragment.is_final);
        assert!(fragment.text.is_empty());
    }
}
