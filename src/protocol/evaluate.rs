//! Evaluation result types and error classification.
//!
//! `Runtime.evaluate` answers with a tagged remote object plus, when the
//! expression raised synchronously, an exception detail block. This module
//! deserializes that shape and turns exception details into classified
//! errors carrying the offending expression.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Marker identifying a parse failure in an exception description.
const SYNTAX_ERROR_MARKER: &str = "SyntaxError: ";

// ============================================================================
// RemoteObjectKind
// ============================================================================

/// Discriminator on an evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteObjectKind {
    /// Object held by reference on the browser side.
    Object,
    /// Function reference.
    Function,
    /// The expression produced `undefined`.
    Undefined,
    /// String value, inlined.
    String,
    /// Numeric value, inlined.
    Number,
    /// Boolean value, inlined.
    Boolean,
    /// Symbol reference.
    Symbol,
    /// BigInt value.
    Bigint,
}

// ============================================================================
// RemoteObject
// ============================================================================

/// A mirrored value or object reference returned by evaluation.
///
/// Primitive results carry their value inline; objects carry a handle and a
/// class name. Thrown errors appear as objects with subtype `error` and a
/// human-readable description.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    /// Shape discriminator.
    #[serde(rename = "type")]
    pub kind: RemoteObjectKind,

    /// Object subtype, e.g. `error` or `node`.
    #[serde(default)]
    pub subtype: Option<String>,

    /// Constructor name for objects.
    #[serde(rename = "className", default)]
    pub class_name: Option<String>,

    /// Inlined value for primitives.
    #[serde(default)]
    pub value: Option<Value>,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Handle for by-reference objects.
    #[serde(rename = "objectId", default)]
    pub object_id: Option<String>,
}

impl RemoteObject {
    /// Returns `true` if the discriminator is `undefined`.
    #[inline]
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.kind == RemoteObjectKind::Undefined
    }

    /// Returns the inlined string value, if this is a string result.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    /// Returns the inlined boolean value, if this is a boolean result.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(Value::as_bool)
    }

    /// Returns the string value, or the empty string when absent.
    #[inline]
    #[must_use]
    pub fn string_value(&self) -> String {
        self.as_str().unwrap_or_default().to_string()
    }
}

// ============================================================================
// ExceptionDetails
// ============================================================================

/// Detail block present when the evaluated expression raised synchronously.
#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionDetails {
    /// Short top-level text, e.g. `Uncaught`.
    #[serde(default)]
    pub text: String,

    /// Line within the evaluated expression.
    #[serde(rename = "lineNumber", default)]
    pub line_number: u32,

    /// Column within the evaluated expression.
    #[serde(rename = "columnNumber", default)]
    pub column_number: u32,

    /// The thrown value, when the browser mirrored it.
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Returns the most descriptive message available.
    ///
    /// Prefers the nested exception description over the top-level text.
    #[must_use]
    pub fn best_description(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| self.text.clone())
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// The full payload answered by `Runtime.evaluate`.
#[derive(Debug, Clone, Deserialize)]
pub struct Evaluation {
    /// The evaluation result.
    pub result: RemoteObject,

    /// Present when the expression raised synchronously.
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<ExceptionDetails>,
}

impl Evaluation {
    /// Parses an evaluation payload from a response result value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload does not have the evaluate
    /// response shape.
    #[inline]
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Classifies the outcome, consuming the evaluation.
    ///
    /// Successful evaluations pass the remote object through. When
    /// exception details are present, the nested description decides the
    /// error kind: descriptions carrying the syntax-error marker become
    /// [`Error::JsSyntax`] with everything up to and including the marker
    /// stripped; everything else becomes [`Error::JsEvaluation`] with the
    /// raw description. Both carry `expression` verbatim.
    ///
    /// # Errors
    ///
    /// [`Error::JsSyntax`] or [`Error::JsEvaluation`] as classified above.
    pub fn classify(self, expression: &str) -> Result<RemoteObject> {
        let Some(details) = self.exception_details else {
            return Ok(self.result);
        };

        let description = details.best_description();

        if description.contains("SyntaxError") {
            let message = match description.find(SYNTAX_ERROR_MARKER) {
                Some(index) => description[index + SYNTAX_ERROR_MARKER.len()..].to_string(),
                None => description,
            };
            return Err(Error::js_syntax(message, expression));
        }

        Err(Error::js_evaluation(description, expression))
    }
}

// ============================================================================
// Tests
// ============================================================================
