// diag.rs — Diagnostics for the Weft verifier and driver
//
// Weft IR has no source text, so diagnostics anchor on operation ids
// instead of spans. The optimizer itself never emits diagnostics: a loop
// with nothing to hoist is silent. Diagnostics come from the verifier and
// from the CLI's input handling.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::id::OpId;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`). Once assigned, a code keeps
/// its semantic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verifier diagnostic codes.
pub mod codes {
    use super::DiagCode;

    /// Region/arena back-references are inconsistent.
    pub const REGION_STRUCTURE: DiagCode = DiagCode("E0101");
    /// Operand has the wrong type for its slot.
    pub const OPERAND_TYPE: DiagCode = DiagCode("E0102");
    /// Value used where its definition does not dominate.
    pub const DOMINANCE: DiagCode = DiagCode("E0103");
    /// Token dependency graph contains a cycle.
    pub const DEPENDENCY_CYCLE: DiagCode = DiagCode("E0104");
    /// Alloc/dealloc scope body is not a single op of the right kind.
    pub const SCOPE_SHAPE: DiagCode = DiagCode("E0105");
    /// Loop body does not end in a single-token yield.
    pub const LOOP_TERMINATOR: DiagCode = DiagCode("E0106");
    /// Asynchronous op without exactly one completion-token result.
    pub const TOKEN_RESULT: DiagCode = DiagCode("E0107");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by the verifier or the driver.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// The operation the diagnostic is anchored on, if any.
    pub op: Option<OpId>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            op: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Anchor the diagnostic on an operation.
    pub fn with_op(mut self, op: OpId) -> Self {
        self.op = Some(op);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(op) = self.op {
            write!(f, " (op {})", op.0)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
