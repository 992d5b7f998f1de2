//! DOM operations built on the evaluate primitive.
//!
//! Every operation is one JavaScript expression evaluated in the page,
//! with the result classified for errors. Caller-supplied selectors and
//! values are JSON-escaped before interpolation so quote characters
//! cannot corrupt the expression text.
//!
//! Click and value assignment impose a fixed settle delay afterward so
//! the page has time to react before the next command; there is no
//! event-driven settled signal in this protocol surface.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Command, Evaluation, RemoteObject};
use crate::transport::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Pause after state-changing operations, and between idle polls.
const SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Sentinel returned when a value read resolves to `undefined`.
const UNDEFINED_SENTINEL: &str = "undefined";

/// Negated library busy flag; truthy once pending requests reach zero.
const NETWORK_IDLE_EXPRESSION: &str = "!window.jQuery.active";

// ============================================================================
// Page
// ============================================================================

/// Command surface for the page attached to a session.
///
/// Cheap to clone; all clones share the session's connection.
#[derive(Clone)]
pub struct Page {
    /// Debugger connection shared with the owning session.
    connection: Connection,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("state", &self.connection.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Page - Evaluate Primitive
// ============================================================================

impl Page {
    /// Creates the command surface over a connection.
    pub(crate) fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Evaluates a JavaScript expression and returns the raw outcome.
    ///
    /// This is the primitive every other operation is built on.
    ///
    /// # Errors
    ///
    /// Connection and protocol errors from the transport; the outcome
    /// itself is returned unclassified.
    pub async fn evaluate(&self, expression: &str) -> Result<Evaluation> {
        debug!(expression_len = expression.len(), "Evaluating expression");

        let value = self
            .connection
            .send(Command::RuntimeEvaluate {
                expression: expression.to_string(),
            })
            .await?;

        Evaluation::from_value(value)
    }

    /// Evaluates an expression and classifies the outcome for errors.
    async fn evaluate_classified(&self, expression: &str) -> Result<RemoteObject> {
        self.evaluate(expression).await?.classify(expression)
    }
}

// ============================================================================
// Page - DOM Operations
// ============================================================================

impl Page {
    /// Clicks the element matching `selector`.
    ///
    /// # Errors
    ///
    /// Classified evaluation errors; a selector matching nothing raises
    /// a generic evaluation error from the null dereference.
    pub async fn click(&self, selector: &str) -> Result<()> {
        let expression = click_expression(selector);
        self.evaluate_classified(&expression).await?;

        sleep(SETTLE_DELAY).await;
        Ok(())
    }

    /// Reads the `value` property of the element matching `selector`.
    ///
    /// A result with discriminator `undefined` (the selector did not
    /// resolve to an input-capable element) returns the literal sentinel
    /// `"undefined"` without being classified as an error.
    ///
    /// # Errors
    ///
    /// Classified evaluation errors for everything else.
    pub async fn input_value(&self, selector: &str) -> Result<String> {
        let expression = read_value_expression(selector);
        let evaluation = self.evaluate(&expression).await?;

        if evaluation.result.is_undefined() {
            return Ok(UNDEFINED_SENTINEL.to_string());
        }

        let object = evaluation.classify(&expression)?;
        Ok(object.string_value())
    }

    /// Assigns the `value` property of the element matching `selector`.
    ///
    /// The value is JSON-escaped before interpolation, so arbitrary
    /// caller strings are safe.
    ///
    /// # Errors
    ///
    /// Classified evaluation errors.
    pub async fn set_input_value(&self, selector: &str, value: &str) -> Result<()> {
        let expression = write_value_expression(selector, value);
        self.evaluate_classified(&expression).await?;

        sleep(SETTLE_DELAY).await;
        Ok(())
    }

    /// Waits until the page-level library reports no pending network
    /// activity.
    ///
    /// Polls the negated busy flag with the settle delay between rounds.
    /// The operation assumes the library is present on the page; without
    /// it the null dereference surfaces as a generic evaluation error,
    /// not a dedicated kind.
    ///
    /// # Errors
    ///
    /// Classified evaluation errors from any poll.
    pub async fn wait_for_network_idle(&self) -> Result<()> {
        loop {
            let object = self.evaluate_classified(NETWORK_IDLE_EXPRESSION).await?;
            if object.as_bool() == Some(true) {
                return Ok(());
            }
            sleep(SETTLE_DELAY).await;
        }
    }
}

// ============================================================================
// Expression Builders
// ============================================================================

/// Escapes a string for safe embedding in JavaScript.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// Query-and-click expression for a selector.
fn click_expression(selector: &str) -> String {
    format!("document.querySelector({}).click()", js_string(selector))
}

/// Property-read expression for a selector's value.
fn read_value_expression(selector: &str) -> String {
    format!("document.querySelector({}).value", js_string(selector))
}

/// Property-assignment expression for a selector's value.
fn write_value_expression(selector: &str, value: &str) -> String {
    format!(
        "document.querySelector({}).value = {}",
        js_string(selector),
        js_string(value)
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::WebSocketStream;
    use url::Url;

    use crate::error::Error;

    type ServerSocket = WebSocketStream<TcpStream>;

    async fn bind_mock() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/devtools/page/TEST")).expect("url");
        (listener, url)
    }

    /// Accepts the driver, answers the handshake, publishes readiness.
    async fn accept_ready(listener: &TcpListener) -> ServerSocket {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("upgrade");

        let handshake = next_eval_frame(&mut ws).await;
        assert_eq!(handshake["method"], "Network.enable");
        send_json(&mut ws, json!({"id": handshake["id"], "result": {}})).await;
        send_json(
            &mut ws,
            json!({"method": "Network.loadingFinished", "params": {}}),
        )
        .await;

        ws
    }

    async fn next_eval_frame(ws: &mut ServerSocket) -> Value {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).expect("frame json");
                }
                Some(Ok(_)) => continue,
                other => panic!("socket ended early: {other:?}"),
            }
        }
    }

    async fn send_json(ws: &mut ServerSocket, value: Value) {
        ws.send(Message::Text(value.to_string().into()))
            .await
            .expect("send");
    }

    /// Answers an evaluate frame with the given evaluation payload.
    async fn answer(ws: &mut ServerSocket, id: &Value, evaluation: Value) {
        send_json(ws, json!({"id": id, "result": evaluation})).await;
    }

    async fn connect_page(url: &Url) -> Page {
        let connection = Connection::open(url, None).await.expect("open");
        connection.wait_connected().await.expect("connected");
        Page::new(connection)
    }

    // ------------------------------------------------------------------
    // Expression builders
    // ------------------------------------------------------------------

    #[test]
    fn test_click_expression_shape() {
        assert_eq!(
            click_expression("#login"),
            r##"document.querySelector("#login").click()"##
        );
    }

    #[test]
    fn test_expressions_escape_quotes() {
        let expression = click_expression(r#"a[href="x"]"#);
        assert_eq!(
            expression,
            r#"document.querySelector("a[href=\"x\"]").click()"#
        );

        let expression = write_value_expression("#name", r#"He said "hi""#);
        assert_eq!(
            expression,
            r##"document.querySelector("#name").value = "He said \"hi\"""##
        );
    }

    #[test]
    fn test_read_value_expression_shape() {
        assert_eq!(
            read_value_expression("#email"),
            r##"document.querySelector("#email").value"##
        );
    }

    // ------------------------------------------------------------------
    // Operations over a scripted connection
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_click_sends_evaluate_and_settles() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;

            let frame = next_eval_frame(&mut ws).await;
            assert_eq!(frame["method"], "Runtime.evaluate");
            assert_eq!(
                frame["params"]["expression"],
                r##"document.querySelector("#login").click()"##
            );
            answer(&mut ws, &frame["id"], json!({"result": {"type": "undefined"}})).await;
        });

        let page = connect_page(&url).await;
        page.click("#login").await.expect("click");

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_input_value_returns_string() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;
            let frame = next_eval_frame(&mut ws).await;
            answer(
                &mut ws,
                &frame["id"],
                json!({"result": {"type": "string", "value": "hello"}}),
            )
            .await;
        });

        let page = connect_page(&url).await;
        let value = page.input_value("#email").await.expect("read");
        assert_eq!(value, "hello");

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_input_value_undefined_sentinel() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;
            let frame = next_eval_frame(&mut ws).await;
            // Selector resolved to a <div>: no value property.
            answer(&mut ws, &frame["id"], json!({"result": {"type": "undefined"}})).await;
        });

        let page = connect_page(&url).await;
        let value = page.input_value("#not-an-input").await.expect("read");
        assert_eq!(value, "undefined");

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_input_value_missing_value_is_empty() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;
            let frame = next_eval_frame(&mut ws).await;
            answer(&mut ws, &frame["id"], json!({"result": {"type": "string"}})).await;
        });

        let page = connect_page(&url).await;
        let value = page.input_value("#email").await.expect("read");
        assert_eq!(value, "");

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_set_input_value_interpolates_escaped() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;
            let frame = next_eval_frame(&mut ws).await;
            assert_eq!(
                frame["params"]["expression"],
                r##"document.querySelector("#name").value = "O\"Brien""##
            );
            answer(&mut ws, &frame["id"], json!({"result": {"type": "string", "value": "O\"Brien"}}))
                .await;
        });

        let page = connect_page(&url).await;
        page.set_input_value("#name", "O\"Brien").await.expect("set");

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_click_syntax_error_classified() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;
            let frame = next_eval_frame(&mut ws).await;
            answer(
                &mut ws,
                &frame["id"],
                json!({
                    "result": {"type": "object", "subtype": "error", "className": "SyntaxError"},
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "exception": {
                            "type": "object",
                            "subtype": "error",
                            "className": "SyntaxError",
                            "description": "SyntaxError: Unexpected identifier"
                        }
                    }
                }),
            )
            .await;
        });

        let page = connect_page(&url).await;
        let err = page.click("#login").await.unwrap_err();

        match err {
            Error::JsSyntax {
                message,
                expression,
            } => {
                assert_eq!(message, "Unexpected identifier");
                assert!(expression.contains("#login"));
            }
            other => panic!("expected JsSyntax, got {other:?}"),
        }

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_network_idle_polls_until_true() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;

            let first = next_eval_frame(&mut ws).await;
            assert_eq!(first["params"]["expression"], "!window.jQuery.active");
            answer(
                &mut ws,
                &first["id"],
                json!({"result": {"type": "boolean", "value": false}}),
            )
            .await;

            let second = next_eval_frame(&mut ws).await;
            answer(
                &mut ws,
                &second["id"],
                json!({"result": {"type": "boolean", "value": true}}),
            )
            .await;
        });

        let page = connect_page(&url).await;
        page.wait_for_network_idle().await.expect("idle");

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_network_idle_without_library_surfaces_evaluation_error() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ready(&listener).await;
            let frame = next_eval_frame(&mut ws).await;
            answer(
                &mut ws,
                &frame["id"],
                json!({
                    "result": {"type": "object", "subtype": "error", "className": "TypeError"},
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "exception": {
                            "type": "object",
                            "subtype": "error",
                            "className": "TypeError",
                            "description": "TypeError: Cannot read properties of undefined (reading 'active')"
                        }
                    }
                }),
            )
            .await;
        });

        let page = connect_page(&url).await;
        let err = page.wait_for_network_idle().await.unwrap_err();

        match err {
            Error::JsEvaluation { description, .. } => {
                assert!(description.contains("Cannot read properties of undefined"));
            }
            other => panic!("expected JsEvaluation, got {other:?}"),
        }

        server.await.expect("server");
    }
}
